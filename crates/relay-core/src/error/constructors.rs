//! Constructor methods for DispatchError

use super::types::DispatchError;

impl DispatchError {
    /// Create a rate limit error
    pub fn rate_limit(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RateLimit {
            provider: provider.into(),
            message: message.into(),
            retry_after_ms: None,
        }
    }

    /// Create a rate limit error carrying the upstream `retry-after` hint
    pub fn rate_limit_with_retry_after(
        provider: impl Into<String>,
        message: impl Into<String>,
        retry_after_ms: u64,
    ) -> Self {
        Self::RateLimit {
            provider: provider.into(),
            message: message.into(),
            retry_after_ms: Some(retry_after_ms),
        }
    }

    /// Create an authentication error
    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Auth {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create an upstream provider error
    pub fn provider(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a circuit-open rejection
    pub fn circuit_open(adapter: impl Into<String>) -> Self {
        Self::CircuitOpen {
            adapter: adapter.into(),
        }
    }

    /// Create the error for a fallback chain that ran out of entries
    pub fn all_adapters_failed(attempted: usize, skipped: usize) -> Self {
        Self::AllAdaptersFailed { attempted, skipped }
    }

    /// Create a streaming error
    pub fn stream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP transport error
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Create a JSON error
    pub fn json(message: impl Into<String>) -> Self {
        Self::Json {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: None,
        }
    }

    /// Create a configuration error with context
    pub fn config_with_context(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            context: Some(context.into()),
        }
    }

    /// Create an unknown-adapter error
    pub fn adapter_not_found(id: impl Into<String>) -> Self {
        Self::AdapterNotFound { id: id.into() }
    }
}
