//! Provider wire dialects
//!
//! A dialect is the vendor-specific half of an HTTP adapter: where to send a
//! request, how to authenticate, and how to translate the canonical shapes
//! to and from the vendor's JSON. Transport, retries and error mapping are
//! shared in [`HttpAdapter`](super::HttpAdapter).

use crate::config::{AdapterConfig, Provider};
use crate::error::DispatchResult;
use crate::llm::messages::{CompletionRequest, FinishReason, ToolCall};
use crate::llm::sse_decoder::SseEvent;
use crate::llm::streaming::StreamChunk;
use crate::types::TokenUsage;
use serde_json::Value;

/// Default completion budget for vendors that require one
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Vendor response translated to canonical parts
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCompletion {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    /// Usage as reported upstream, if it was
    pub usage: Option<TokenUsage>,
    pub finish_reason: FinishReason,
    /// Model name echoed by the vendor
    pub model: Option<String>,
}

pub trait ProviderDialect: Send + Sync + 'static {
    /// Per-stream parser state
    type StreamState: Default + Send + 'static;

    fn provider(&self) -> Provider;

    /// Endpoint for a completion call
    fn completion_url(&self, base_url: &str, model: &str, stream: bool) -> String;

    /// Endpoint probed by `health_check`
    fn health_url(&self, base_url: &str, model: &str) -> String;

    /// Authentication and versioning headers
    fn headers(&self, config: &AdapterConfig, api_key: Option<&str>) -> Vec<(&'static str, String)>;

    fn build_body(&self, model: &str, request: &CompletionRequest, stream: bool) -> Value;

    fn parse_response(&self, body: Value) -> DispatchResult<ParsedCompletion>;

    /// Translate one SSE event into zero or more chunks.
    ///
    /// Returning a `Done` or `Error` chunk ends the stream.
    fn parse_stream_event(
        &self,
        state: &mut Self::StreamState,
        event: &SseEvent,
    ) -> DispatchResult<Vec<StreamChunk>>;

    /// Terminal chunk for a stream that closed without an explicit end
    /// event, if the state shows the response completed.
    fn finish_stream(&self, _state: &mut Self::StreamState) -> Option<StreamChunk> {
        None
    }
}

/// Parse tool-call arguments that arrive as a JSON-encoded string
pub(crate) fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub(crate) fn as_u32(value: &Value) -> u32 {
    value.as_u64().unwrap_or(0).min(u32::MAX as u64) as u32
}
