//! Fallback chain and single-shot dispatch

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::types::{FallbackConfig, FallbackEvent, FallbackReason};
use crate::config::Provider;
use crate::error::{DispatchError, DispatchResult};
use crate::llm::adapter::CompletionAdapter;
use crate::llm::messages::{CompletionRequest, CompletionResponse};
use crate::recovery::{CircuitBreaker, Clock, TokioClock};

/// One adapter with the breaker that guards it
pub(super) struct ChainEntry {
    pub adapter: Arc<dyn CompletionAdapter>,
    pub breaker: CircuitBreaker,
}

/// Ordered list of adapters tried until one succeeds.
///
/// The order is fixed at construction. Entry 0 is the primary and names the
/// chain's provider; reconfiguring means building a new chain.
pub struct FallbackChain {
    pub(super) entries: Vec<ChainEntry>,
    pub(super) history: Mutex<VecDeque<FallbackEvent>>,
    pub(super) max_history: usize,
}

impl FallbackChain {
    /// Create a chain whose breakers use tokio time
    pub fn new(config: FallbackConfig) -> Self {
        Self::with_clock(config, TokioClock::shared())
    }

    /// Create a chain whose breakers read time from `clock`
    pub fn with_clock(config: FallbackConfig, clock: Arc<dyn Clock>) -> Self {
        let entries = config
            .adapters
            .into_iter()
            .map(|adapter| ChainEntry {
                breaker: CircuitBreaker::with_clock(
                    adapter.id().to_string(),
                    config.circuit_breaker,
                    clock.clone(),
                ),
                adapter,
            })
            .collect();

        Self {
            entries,
            history: Mutex::new(VecDeque::new()),
            max_history: config.history_limit,
        }
    }

    /// Provider of the primary adapter
    pub fn provider(&self) -> Option<Provider> {
        self.entries.first().map(|e| e.adapter.provider())
    }

    /// The primary adapter
    pub fn primary(&self) -> Option<&Arc<dyn CompletionAdapter>> {
        self.entries.first().map(|e| &e.adapter)
    }

    /// Breaker guarding the adapter with `id`
    pub fn breaker(&self, id: &str) -> Option<&CircuitBreaker> {
        self.entries
            .iter()
            .find(|e| e.adapter.id() == id)
            .map(|e| &e.breaker)
    }

    /// Complete `request` with the first adapter that succeeds.
    ///
    /// Entries whose breaker is open are skipped without being called. When
    /// every entry fails the last adapter's error is returned; when nothing
    /// was attempted the result is [`DispatchError::AllAdaptersFailed`].
    #[instrument(skip_all, fields(entries = self.entries.len()))]
    pub async fn complete(&self, request: &CompletionRequest) -> DispatchResult<CompletionResponse> {
        let mut last_error: Option<DispatchError> = None;
        let mut attempted = 0;
        let mut skipped = 0;

        for (position, entry) in self.entries.iter().enumerate() {
            let id = entry.adapter.id();

            let permit = if entry.breaker.is_open() {
                None
            } else {
                entry.breaker.try_acquire().ok()
            };
            let Some(permit) = permit else {
                debug!(adapter = id, position, "skipping adapter with open circuit");
                skipped += 1;
                self.record_event(position, FallbackReason::CircuitOpen);
                continue;
            };

            attempted += 1;
            match entry.adapter.complete(request).await {
                Ok(response) => {
                    permit.success();
                    if position > 0 {
                        info!(adapter = id, position, "fallback adapter served the request");
                    }
                    return Ok(response);
                }
                Err(error) => {
                    permit.failure();
                    warn!(adapter = id, position, error = %error, "adapter failed, trying next");
                    self.record_event(position, FallbackReason::from_error(&error));
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DispatchError::all_adapters_failed(attempted, skipped)))
    }

    /// Append to the bounded history; `to_adapter` is the next entry in order
    pub(super) fn record_event(&self, position: usize, reason: FallbackReason) {
        let Some(from) = self.entries.get(position) else {
            return;
        };
        let event = FallbackEvent {
            from_adapter: from.adapter.id().to_string(),
            to_adapter: self
                .entries
                .get(position + 1)
                .map(|e| e.adapter.id().to_string()),
            reason,
            timestamp: Utc::now(),
        };

        let mut history = self.history.lock();
        history.push_back(event);
        while history.len() > self.max_history {
            history.pop_front();
        }
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("adapters", &self.adapter_ids())
            .field("max_history", &self.max_history)
            .finish()
    }
}
