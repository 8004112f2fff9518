//! Backoff schedule for retry operations
//!
//! The first retry waits the initial delay; each later retry doubles it,
//! capped at `max_delay`, with optional symmetric jitter.

use rand::Rng;
use std::time::Duration;

/// Upper bound on any single backoff delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Configuration for backoff behavior
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Add random jitter to prevent thundering herd
    pub jitter: bool,
    /// Maximum jitter ratio (0.0 - 1.0)
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: 2.0,
            jitter: true,
            jitter_ratio: 0.2,
        }
    }
}

impl BackoffConfig {
    /// Create a new backoff config with custom initial delay
    pub fn with_initial_delay(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            ..Default::default()
        }
    }

    /// Set the maximum delay
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the multiplier
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Exponential backoff implementation
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay before retry number `retry` (1-based, so retry 1 waits the initial delay)
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(63) as i32;
        let base = self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        // A multiplier below zero flips the sign on odd exponents
        let capped = base.min(self.config.max_delay.as_secs_f64()).max(0.0);

        Duration::from_secs_f64(self.add_jitter(capped))
    }

    fn add_jitter(&self, delay_secs: f64) -> f64 {
        if !self.config.jitter || delay_secs <= 0.0 {
            return delay_secs;
        }

        let range = delay_secs * self.config.jitter_ratio.clamp(0.0, 1.0);
        if range <= 0.0 {
            return delay_secs;
        }
        let jitter = rand::thread_rng().gen_range(-range..=range);
        (delay_secs + jitter).max(0.0)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
