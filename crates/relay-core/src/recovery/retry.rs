//! Retry-timeout wrapper for upstream calls
//!
//! Each attempt races the operation against a per-attempt timer. A failed
//! attempt is retried after an exponential backoff delay when the classifier
//! says the error is transient and attempts remain; anything else propagates
//! immediately. Attempt N+1 never starts before attempt N has resolved.

use super::backoff::{BackoffConfig, ExponentialBackoff};
use super::clock::{Clock, TokioClock};
use crate::config::AdapterConfig;
use crate::error::{DispatchError, DispatchResult, is_retryable};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Called before every retry with `(error, attempt, delay)`.
///
/// `attempt` is the 1-based number of the attempt that just failed.
pub type RetryObserver = Arc<dyn Fn(&DispatchError, u32, Duration) + Send + Sync>;

/// Decides whether an error is worth another attempt
pub type RetryClassifier = Arc<dyn Fn(&DispatchError) -> bool + Send + Sync>;

/// Timeout and retry budget for one adapter
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; 0 is treated as 1
    pub max_attempts: u32,
    /// Per-attempt timeout
    pub timeout: Duration,
    pub backoff: BackoffConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            timeout: Duration::from_millis(crate::config::adapter::DEFAULT_TIMEOUT_MS),
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryPolicy {
    /// Policy derived from an adapter's configured retries and timeout
    pub fn from_adapter_config(config: &AdapterConfig) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            timeout: config.timeout(),
            backoff: BackoffConfig::with_initial_delay(Duration::from_millis(
                config.retry_base_delay_ms,
            )),
        }
    }

    /// Single attempt, no retry
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            timeout,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Bounded timeout and classified retry around an async operation
#[derive(Clone)]
pub struct RetryTimeout {
    name: String,
    policy: RetryPolicy,
    backoff: ExponentialBackoff,
    clock: Arc<dyn Clock>,
    classifier: RetryClassifier,
    observer: Option<RetryObserver>,
}

impl std::fmt::Debug for RetryTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTimeout")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl RetryTimeout {
    /// Wrapper using the default error classifier and the tokio clock
    pub fn new(name: impl Into<String>, policy: RetryPolicy) -> Self {
        let backoff = ExponentialBackoff::new(policy.backoff.clone());
        Self {
            name: name.into(),
            policy,
            backoff,
            clock: Arc::new(TokioClock),
            classifier: Arc::new(is_retryable),
            observer: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_classifier(mut self, classifier: RetryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Run `operation` under the timeout and retry policy
    #[instrument(skip(self, operation), fields(adapter = %self.name, max_attempts = self.max_attempts()))]
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> DispatchResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DispatchResult<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            let error = match self.attempt(operation()).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                if max_attempts > 1 {
                    warn!(attempts = attempt, error = %error, "all retry attempts exhausted");
                }
                return Err(error);
            }
            if !(self.classifier)(&error) {
                debug!(attempt, error = %error, "non-retryable error");
                return Err(error);
            }

            let delay = self.delay_after(attempt, &error);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after failure"
            );
            if let Some(observer) = &self.observer {
                observer(&error, attempt, delay);
            }

            self.clock.sleep(delay).await;
            attempt += 1;
        }
    }

    /// Race one attempt against the timeout. Losing the race drops the
    /// operation's future, discarding any response that arrives later.
    async fn attempt<T, Fut>(&self, operation: Fut) -> DispatchResult<T>
    where
        Fut: Future<Output = DispatchResult<T>>,
    {
        let timer = self.clock.sleep(self.policy.timeout);
        tokio::select! {
            biased;
            result = operation => result,
            _ = timer => Err(DispatchError::timeout(
                self.name.clone(),
                self.policy.timeout.as_millis() as u64,
            )),
        }
    }

    /// Backoff delay, stretched to an upstream `retry-after` hint within the cap
    fn delay_after(&self, attempt: u32, error: &DispatchError) -> Duration {
        let delay = self.backoff.delay_for_retry(attempt);
        match error {
            DispatchError::RateLimit {
                retry_after_ms: Some(ms),
                ..
            } => delay
                .max(Duration::from_millis(*ms))
                .min(self.policy.backoff.max_delay),
            _ => delay,
        }
    }
}
