//! Completion adapter capability set
//!
//! A [`CompletionAdapter`] performs completions against exactly one
//! provider/model pair. The dispatch layer (fallback chain, registry) only
//! ever talks to adapters through this trait; which concrete adapter backs an
//! id is decided once, by an [`AdapterFactory`], when the adapter is built.

use crate::config::{AdapterConfig, Provider};
use crate::error::DispatchResult;
use crate::llm::messages::{CompletionRequest, CompletionResponse};
use crate::llm::streaming::CompletionStream;
use crate::types::TokenUsage;
use async_trait::async_trait;
use std::sync::Arc;

/// One provider/model pair that can serve completions
#[async_trait]
pub trait CompletionAdapter: Send + Sync {
    /// Caller-assigned id of the config this adapter was built from
    fn id(&self) -> &str;

    fn provider(&self) -> Provider;

    fn model(&self) -> &str;

    /// Single-shot completion, with the adapter's retry and timeout policy applied
    async fn complete(&self, request: &CompletionRequest) -> DispatchResult<CompletionResponse>;

    /// Streaming completion.
    ///
    /// Failures are reported in-band: the stream ends with exactly one
    /// `Done` or exactly one `Error` chunk.
    fn stream<'a>(&'a self, request: &'a CompletionRequest) -> CompletionStream<'a>;

    /// Heuristic token count for `text`
    fn count_tokens(&self, text: &str) -> u64;

    /// Estimated cost in USD for `usage` on this adapter's model
    fn estimate_cost(&self, usage: &TokenUsage) -> f64;

    /// Cheap reachability probe
    async fn health_check(&self) -> DispatchResult<bool>;
}

/// Builds adapters from configuration
#[cfg_attr(test, mockall::automock)]
pub trait AdapterFactory: Send + Sync {
    fn build(&self, config: &AdapterConfig) -> DispatchResult<Arc<dyn CompletionAdapter>>;
}
