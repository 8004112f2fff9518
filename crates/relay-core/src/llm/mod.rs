//! Completion adapters and dispatch

pub mod adapter;
pub mod fallback;
pub mod messages;
pub mod providers;
pub mod registry;
pub mod sse_decoder;
pub mod streaming;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::{AdapterFactory, CompletionAdapter};
pub use fallback::{
    ChainEntryStatus, FallbackChain, FallbackChainBuilder, FallbackConfig, FallbackEvent,
    FallbackReason,
};
pub use messages::{
    CompletionRequest, CompletionResponse, FinishReason, Message, MessageRole, ToolCall,
    ToolDefinition,
};
pub use providers::{HttpAdapter, HttpAdapterFactory};
pub use registry::AdapterRegistry;
pub use sse_decoder::{SseDecoder, SseEvent};
pub use streaming::{CompletionStream, StreamChunk};
