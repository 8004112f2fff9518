//! Circuit breaker implementation
//!
//! All state lives behind one mutex and every transition bumps an epoch.
//! A permit remembers the epoch it was issued in; an outcome reported under
//! an older epoch still counts toward the totals but cannot move the state
//! machine, so two racing failures cannot both trip the circuit and a late
//! success cannot close a circuit that has since reopened.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use super::types::{CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
use crate::error::{DispatchError, DispatchResult};
use crate::recovery::clock::{Clock, TokioClock};

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
    epoch: u64,
}

/// Circuit breaker for protecting against failing dependencies
pub struct CircuitBreaker {
    /// Component name (for logging)
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerState>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_rejections: AtomicU64,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker with default config
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    /// Create a new circuit breaker with custom config
    pub fn with_config(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(TokioClock))
    }

    /// Create a circuit breaker reading time from `clock`
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                half_open_in_flight: 0,
                epoch: 0,
            }),
            total_calls: AtomicU64::new(0),
            total_failures: AtomicU64::new(0),
            total_rejections: AtomicU64::new(0),
        }
    }

    /// Get the component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, without side effects.
    ///
    /// An open circuit whose cooldown has elapsed reports `HalfOpen`; the
    /// transition itself happens when the next call is admitted.
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        self.effective_state(&inner)
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    fn effective_state(&self, inner: &BreakerState) -> CircuitState {
        match inner.state {
            CircuitState::Open if self.cooldown_elapsed(inner) => CircuitState::HalfOpen,
            state => state,
        }
    }

    fn cooldown_elapsed(&self, inner: &BreakerState) -> bool {
        inner.opened_at.is_none_or(|opened_at| {
            self.clock.now().saturating_duration_since(opened_at) >= self.config.reset_timeout()
        })
    }

    /// Ask to run one call.
    ///
    /// Fails with [`DispatchError::CircuitOpen`] while the circuit is open or
    /// every half-open trial slot is taken.
    pub fn try_acquire(&self) -> DispatchResult<BreakerPermit<'_>> {
        let mut inner = self.inner.lock();

        let admitted = match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::Open if self.cooldown_elapsed(&inner) => {
                self.transition(&mut inner, CircuitState::HalfOpen);
                inner.half_open_in_flight = 1;
                Some(true)
            }
            CircuitState::Open => None,
            CircuitState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_max_calls.max(1) {
                    inner.half_open_in_flight += 1;
                    Some(true)
                } else {
                    None
                }
            }
        };

        match admitted {
            Some(trial) => Ok(BreakerPermit {
                breaker: self,
                epoch: inner.epoch,
                trial,
                settled: false,
            }),
            None => {
                self.total_rejections.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(circuit = %self.name, state = %inner.state, "call rejected");
                Err(DispatchError::circuit_open(self.name.clone()))
            }
        }
    }

    /// Execute an operation with circuit breaker protection.
    ///
    /// The operation's own error is returned unchanged after being counted.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> DispatchResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DispatchResult<T>>,
    {
        let permit = self.try_acquire()?;

        match operation().await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(error) => {
                permit.failure();
                Err(error)
            }
        }
    }

    /// Get circuit breaker statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            state: self.effective_state(&inner),
            consecutive_failures: inner.consecutive_failures,
            half_open_in_flight: inner.half_open_in_flight,
            total_calls: self.total_calls.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            total_rejections: self.total_rejections.load(Ordering::Relaxed),
            opened_at: inner.opened_at,
        }
    }

    /// Manually reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::Closed);
    }

    /// Manually open the circuit breaker
    pub fn trip(&self) {
        let mut inner = self.inner.lock();
        self.transition(&mut inner, CircuitState::Open);
    }

    fn on_success(&self, epoch: u64) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return;
        }
        match inner.state {
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Closed),
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, epoch: u64) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        self.total_failures.fetch_add(1, Ordering::Relaxed);

        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return;
        }
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.consecutive_failures += 1;
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    fn release_trial(&self, epoch: u64) {
        let mut inner = self.inner.lock();
        if inner.epoch == epoch && inner.state == CircuitState::HalfOpen {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        let from = inner.state;
        inner.state = to;
        inner.epoch = inner.epoch.wrapping_add(1);
        inner.half_open_in_flight = 0;

        match to {
            CircuitState::Open => {
                inner.opened_at = Some(self.clock.now());
                tracing::warn!(
                    circuit = %self.name,
                    %from,
                    to = %to,
                    consecutive_failures = inner.consecutive_failures,
                    "circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                tracing::info!(circuit = %self.name, %from, to = %to, "circuit breaker half-open");
            }
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                tracing::info!(circuit = %self.name, %from, to = %to, "circuit breaker closed");
            }
        }
    }
}

/// Admission ticket for one call through a [`CircuitBreaker`].
///
/// Report the outcome with [`success`](Self::success) or
/// [`failure`](Self::failure). Dropping the permit without an outcome
/// frees its half-open slot and records nothing.
#[must_use = "report the call outcome with success() or failure()"]
#[derive(Debug)]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    epoch: u64,
    trial: bool,
    settled: bool,
}

impl BreakerPermit<'_> {
    /// Whether this call is a half-open trial
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.epoch);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.epoch);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.trial {
            self.breaker.release_trial(self.epoch);
        }
    }
}
