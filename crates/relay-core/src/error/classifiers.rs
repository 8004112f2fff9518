//! Retry classification

use super::types::DispatchError;

/// Message fragments that mark an otherwise unclassified failure as transient
const RETRYABLE_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "429",
    "timeout",
    "timed out",
    "503",
    "529",
    "overloaded",
];

/// Decide whether an error is transient and worth another attempt.
///
/// Rate limits and timeouts always are; authentication, configuration and
/// breaker rejections never are. Upstream failures are retryable when they
/// carry a 503/529 status or their normalized message names one of the
/// transient conditions.
pub fn is_retryable(error: &DispatchError) -> bool {
    match error {
        DispatchError::RateLimit { .. } | DispatchError::Timeout { .. } => true,
        DispatchError::Auth { .. }
        | DispatchError::Config { .. }
        | DispatchError::AdapterNotFound { .. }
        | DispatchError::CircuitOpen { .. }
        | DispatchError::AllAdaptersFailed { .. }
        | DispatchError::Json { .. } => false,
        DispatchError::Provider {
            status: Some(503 | 529 | 429),
            ..
        } => true,
        DispatchError::Provider { message, .. }
        | DispatchError::Stream { message, .. }
        | DispatchError::Http { message }
        | DispatchError::Io { message } => has_retryable_marker(message),
    }
}

fn has_retryable_marker(message: &str) -> bool {
    let normalized = message.to_lowercase();
    RETRYABLE_MARKERS
        .iter()
        .any(|marker| normalized.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_and_timeout_are_retryable() {
        assert!(is_retryable(&DispatchError::rate_limit("anthropic", "slow down")));
        assert!(is_retryable(&DispatchError::timeout("completion", 60_000)));
    }

    #[test]
    fn test_overload_statuses_are_retryable() {
        assert!(is_retryable(&DispatchError::provider("openai", Some(503), "unavailable")));
        assert!(is_retryable(&DispatchError::provider("anthropic", Some(529), "busy")));
        assert!(!is_retryable(&DispatchError::provider("openai", Some(500), "boom")));
    }

    #[test]
    fn test_message_markers() {
        assert!(is_retryable(&DispatchError::http("upstream returned 503 Service Unavailable")));
        assert!(is_retryable(&DispatchError::provider("google", None, "Model is Overloaded")));
        assert!(!is_retryable(&DispatchError::provider("google", None, "invalid argument")));
    }

    #[test]
    fn test_auth_fails_fast() {
        assert!(!is_retryable(&DispatchError::auth("anthropic", "invalid x-api-key")));
        // even when the message happens to mention a transient marker
        assert!(!is_retryable(&DispatchError::auth("openai", "token timeout")));
    }

    #[test]
    fn test_breaker_rejection_is_not_retryable() {
        assert!(!is_retryable(&DispatchError::circuit_open("primary")));
    }
}
