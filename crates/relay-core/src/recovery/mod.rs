//! Recovery primitives for upstream calls
//!
//! - [`clock`]: injectable time source shared by every timer below
//! - [`backoff`]: exponential delay schedule
//! - [`retry`]: per-attempt timeout and classified retry loop
//! - [`circuit_breaker`]: per-adapter failure gate

pub mod backoff;
pub mod circuit_breaker;
pub mod clock;
pub mod retry;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use circuit_breaker::{
    BreakerPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};
pub use clock::{Clock, ManualClock, TokioClock};
pub use retry::{RetryObserver, RetryPolicy, RetryTimeout};
