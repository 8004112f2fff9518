//! Core error types

use thiserror::Error;

/// Result type alias for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Main error type for the dispatch layer
///
/// The enum is `Clone` so a fallback chain can keep the last failure around
/// while it moves on to the next adapter.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// Upstream rejected the call because of a rate or quota limit
    #[error("{provider} rate limit exceeded: {message}")]
    RateLimit {
        provider: String,
        message: String,
        retry_after_ms: Option<u64>,
    },

    /// Credentials were missing, invalid or lacked permission
    #[error("{provider} authentication failed: {message}")]
    Auth { provider: String, message: String },

    /// An attempt did not resolve before its deadline
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Upstream answered with a failure that is not auth or rate limiting
    #[error("{provider} API error{}: {message}", status_suffix(.status))]
    Provider {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The adapter's circuit breaker rejected the call without attempting it
    #[error("circuit breaker open for adapter: {adapter}")]
    CircuitOpen { adapter: String },

    /// Every entry of a fallback chain failed or was skipped
    #[error("all adapters failed ({attempted} attempted, {skipped} skipped)")]
    AllAdaptersFailed { attempted: usize, skipped: usize },

    /// A streaming response broke off or reported an error event
    #[error("{provider} stream error: {message}")]
    Stream { provider: String, message: String },

    /// Transport-level HTTP failure
    #[error("HTTP error: {message}")]
    Http { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json { message: String },

    /// IO errors
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        context: Option<String>,
    },

    /// Registry lookup for an id that was never configured
    #[error("adapter not found: {id}")]
    AdapterNotFound { id: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {})", s)).unwrap_or_default()
}

impl DispatchError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            Self::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    /// Whether the retry wrapper may try again after this error
    pub fn is_retryable(&self) -> bool {
        super::classifiers::is_retryable(self)
    }
}
