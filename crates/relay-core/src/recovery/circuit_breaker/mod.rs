//! Circuit breaker pattern for fault tolerance
//!
//! Stops sending traffic to an adapter that keeps failing and probes it
//! again after a cooldown.

mod breaker;
mod types;


pub use breaker::{BreakerPermit, CircuitBreaker};
pub use types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
