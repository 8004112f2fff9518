//! Error types for Relay
//!
//! Every fallible operation in the dispatch layer returns [`DispatchResult`].
//! The taxonomy separates transient upstream failures (rate limits, timeouts,
//! overloaded providers) from terminal ones (bad credentials, bad config) so
//! that the retry wrapper, circuit breaker and fallback chain can each make
//! their decision from the error alone.

mod classifiers;
mod constructors;
mod conversions;
mod types;

pub use classifiers::is_retryable;
pub use types::{DispatchError, DispatchResult};
