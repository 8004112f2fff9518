//! Streaming response support
//!
//! A completion stream is a lazy, finite sequence of [`StreamChunk`]s. Failure
//! is reported in-band: a stream either ends with exactly one
//! [`StreamChunk::Done`] or with exactly one [`StreamChunk::Error`], and
//! consumers must treat either as the end of the stream.

use crate::llm::messages::{FinishReason, ToolCall};
use crate::types::TokenUsage;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A chunk of streaming response data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Incremental text
    Content { text: String },
    /// A fully assembled tool call
    ToolCall { call: ToolCall },
    /// Output received so far came from an abandoned attempt and must be
    /// discarded; the chunks that follow come from `from_adapter`'s successor
    Reset { from_adapter: String, reason: String },
    /// Successful end of the stream
    Done {
        usage: Option<TokenUsage>,
        finish_reason: FinishReason,
    },
    /// Failed end of the stream
    Error { message: String },
}

impl StreamChunk {
    /// Create a content chunk
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    /// Create a tool call chunk
    pub fn tool_call(call: ToolCall) -> Self {
        Self::ToolCall { call }
    }

    /// Create the terminal success chunk
    pub fn done(usage: Option<TokenUsage>, finish_reason: FinishReason) -> Self {
        Self::Done {
            usage,
            finish_reason,
        }
    }

    /// Create the terminal error chunk
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this chunk ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// Whether this chunk reports a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Whether this chunk carries model output
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Content { .. } | Self::ToolCall { .. })
    }
}

/// Stream of completion chunks
pub type CompletionStream<'a> = Pin<Box<dyn Stream<Item = StreamChunk> + Send + 'a>>;

/// Utility functions for working with streams
pub mod stream_utils {
    use super::*;
    use crate::config::Provider;
    use crate::error::{DispatchError, DispatchResult};
    use crate::llm::messages::CompletionResponse;
    use futures::StreamExt;

    /// Collect a stream into a complete response.
    ///
    /// `Reset` chunks discard everything accumulated so far. An `Error` chunk
    /// turns into a [`DispatchError::Stream`].
    pub async fn collect_stream(
        mut stream: CompletionStream<'_>,
        provider: Provider,
        model: impl Into<String>,
    ) -> DispatchResult<CompletionResponse> {
        let started = tokio::time::Instant::now();
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::Content { text } => content.push_str(&text),
                StreamChunk::ToolCall { call } => tool_calls.push(call),
                StreamChunk::Reset { .. } => {
                    content.clear();
                    tool_calls.clear();
                }
                StreamChunk::Done {
                    usage,
                    finish_reason,
                } => {
                    return Ok(CompletionResponse {
                        content,
                        usage: usage.unwrap_or_default(),
                        latency_ms: started.elapsed().as_millis() as u64,
                        finish_reason,
                        tool_calls,
                        model: model.into(),
                        provider,
                    });
                }
                StreamChunk::Error { message } => {
                    return Err(DispatchError::stream(provider.to_string(), message));
                }
            }
        }

        Err(DispatchError::stream(
            provider.to_string(),
            "stream ended without a terminal chunk",
        ))
    }

}
