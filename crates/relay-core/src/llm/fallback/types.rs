//! Type definitions for the fallback chain

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Provider;
use crate::config::relay_config::DEFAULT_HISTORY_LIMIT;
use crate::error::DispatchError;
use crate::llm::adapter::CompletionAdapter;
use crate::recovery::{CircuitBreakerConfig, CircuitState};

/// Why the chain moved past an adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Upstream rate limited the call
    RateLimited,
    /// The attempt ran out of time
    Timeout,
    /// Credentials were rejected
    Auth,
    /// The adapter's breaker refused the call
    CircuitOpen,
    /// The stream broke off or reported an error
    StreamError(String),
    /// Any other failure
    Error(String),
}

impl FallbackReason {
    /// Classify a failed call
    pub fn from_error(error: &DispatchError) -> Self {
        match error {
            DispatchError::RateLimit { .. } => Self::RateLimited,
            DispatchError::Timeout { .. } => Self::Timeout,
            DispatchError::Auth { .. } => Self::Auth,
            DispatchError::CircuitOpen { .. } => Self::CircuitOpen,
            DispatchError::Stream { message, .. } => Self::StreamError(message.clone()),
            other => Self::Error(other.to_string()),
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited"),
            Self::Timeout => write!(f, "timeout"),
            Self::Auth => write!(f, "authentication failed"),
            Self::CircuitOpen => write!(f, "circuit open"),
            Self::StreamError(e) => write!(f, "stream error: {}", e),
            Self::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// Record of the chain moving past an adapter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackEvent {
    /// Adapter that failed or was skipped
    pub from_adapter: String,
    /// Next adapter in priority order, if any
    pub to_adapter: Option<String>,
    pub reason: FallbackReason,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of one chain entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainEntryStatus {
    pub id: String,
    pub provider: Provider,
    pub model: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub total_failures: u64,
}

/// Inputs for building a [`FallbackChain`](super::FallbackChain)
#[derive(Clone)]
pub struct FallbackConfig {
    /// Adapters in priority order
    pub adapters: Vec<Arc<dyn CompletionAdapter>>,
    /// Settings for the breaker created per adapter
    pub circuit_breaker: CircuitBreakerConfig,
    /// Maximum number of retained [`FallbackEvent`]s
    pub history_limit: usize,
}

impl FallbackConfig {
    pub fn new(adapters: Vec<Arc<dyn CompletionAdapter>>) -> Self {
        Self {
            adapters,
            circuit_breaker: CircuitBreakerConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}

impl std::fmt::Debug for FallbackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.adapters.iter().map(|a| a.id()).collect();
        f.debug_struct("FallbackConfig")
            .field("adapters", &ids)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_reason_from_error() {
        assert_eq!(
            FallbackReason::from_error(&DispatchError::rate_limit("openai", "slow down")),
            FallbackReason::RateLimited
        );
        assert_eq!(
            FallbackReason::from_error(&DispatchError::timeout("a", 10)),
            FallbackReason::Timeout
        );
        assert_eq!(
            FallbackReason::from_error(&DispatchError::stream("google", "reset by peer")),
            FallbackReason::StreamError("reset by peer".to_string())
        );
        assert!(matches!(
            FallbackReason::from_error(&DispatchError::provider("anthropic", Some(500), "boom")),
            FallbackReason::Error(msg) if msg.contains("boom")
        ));
    }

    #[test]
    fn test_fallback_reason_display() {
        assert_eq!(FallbackReason::RateLimited.to_string(), "rate limited");
        assert_eq!(FallbackReason::CircuitOpen.to_string(), "circuit open");
        assert!(FallbackReason::Error("test".into()).to_string().contains("test"));
    }

    #[test]
    fn test_config_defaults() {
        let config = FallbackConfig::new(Vec::new());
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.circuit_breaker.reset_timeout_ms, 30_000);
        assert_eq!(config.circuit_breaker.half_open_max_calls, 1);
    }
}
