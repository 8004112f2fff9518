//! Fallback chain operations (estimates, health checks, status, history)

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use super::manager::FallbackChain;
use super::types::{ChainEntryStatus, FallbackEvent};
use crate::llm::adapter::CompletionAdapter;
use crate::types::TokenUsage;

impl FallbackChain {
    /// Token estimate from the primary adapter, regardless of its breaker
    pub fn count_tokens(&self, text: &str) -> u64 {
        self.primary().map_or(0, |adapter| adapter.count_tokens(text))
    }

    /// Cost estimate from the primary adapter, regardless of its breaker
    pub fn estimate_cost(&self, usage: &TokenUsage) -> f64 {
        self.primary()
            .map_or(0.0, |adapter| adapter.estimate_cost(usage))
    }

    /// True if at least one adapter reports healthy.
    ///
    /// Probe errors count as unhealthy.
    pub async fn health_check(&self) -> bool {
        let probes = self.entries.iter().map(|entry| async move {
            match entry.adapter.health_check().await {
                Ok(healthy) => healthy,
                Err(e) => {
                    debug!(adapter = entry.adapter.id(), error = %e, "health probe failed");
                    false
                }
            }
        });
        join_all(probes).await.into_iter().any(|healthy| healthy)
    }

    /// First adapter whose breaker is not open and whose probe succeeds
    pub async fn healthy_adapter(&self) -> Option<Arc<dyn CompletionAdapter>> {
        for entry in &self.entries {
            if entry.breaker.is_open() {
                continue;
            }
            if matches!(entry.adapter.health_check().await, Ok(true)) {
                return Some(entry.adapter.clone());
            }
        }
        None
    }

    /// Snapshot of every entry in priority order
    pub fn status(&self) -> Vec<ChainEntryStatus> {
        self.entries
            .iter()
            .map(|entry| {
                let stats = entry.breaker.stats();
                ChainEntryStatus {
                    id: entry.adapter.id().to_string(),
                    provider: entry.adapter.provider(),
                    model: entry.adapter.model().to_string(),
                    state: stats.state,
                    consecutive_failures: stats.consecutive_failures,
                    total_calls: stats.total_calls,
                    total_failures: stats.total_failures,
                }
            })
            .collect()
    }

    /// Close every breaker in the chain
    pub fn reset_breakers(&self) {
        for entry in &self.entries {
            entry.breaker.reset();
        }
    }

    /// Recorded fallback events, oldest first
    pub fn history(&self) -> Vec<FallbackEvent> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Adapter ids in priority order
    pub fn adapter_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.adapter.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
