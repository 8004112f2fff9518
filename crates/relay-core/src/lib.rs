//! Relay Core Library
//!
//! Resilient dispatch of LLM completions across providers: per-call retry
//! with timeouts, a circuit breaker per adapter, ordered fallback for
//! single-shot and streaming completions, and a registry that builds and
//! caches adapters from configuration.

pub mod config;
pub mod cost;
pub mod error;
pub mod llm;
pub mod recovery;
pub mod types;

// Re-export commonly used types
pub use config::{AdapterConfig, AdapterConfigPatch, Provider, RegistryConfig, RelayConfig};
pub use error::{DispatchError, DispatchResult};
pub use llm::{
    AdapterFactory, AdapterRegistry, CompletionAdapter, CompletionRequest, CompletionResponse,
    CompletionStream, FallbackChain, FallbackChainBuilder, FallbackConfig, Message, StreamChunk,
};
pub use recovery::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, ManualClock, TokioClock};
pub use types::TokenUsage;
