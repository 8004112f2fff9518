//! Adapter lookup and lazy construction

use std::sync::Arc;

use tracing::debug;

use super::types::AdapterRegistry;
use crate::config::AdapterConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::llm::adapter::CompletionAdapter;
use crate::llm::fallback::{FallbackChain, FallbackConfig};
use crate::recovery::{CircuitBreakerConfig, Clock};

impl AdapterRegistry {
    /// Cached adapter for `id`, built on first use.
    ///
    /// Construction runs outside the lock. When two callers race on an
    /// unseen id the first stored adapter wins; a build that raced a config
    /// change is discarded and redone with the new config.
    pub fn get(&self, id: &str) -> DispatchResult<Arc<dyn CompletionAdapter>> {
        loop {
            let (config, version) = {
                let state = self.state.read();
                let entry = state
                    .entry(id)
                    .ok_or_else(|| DispatchError::adapter_not_found(id))?;
                if let Some(adapter) = &entry.adapter {
                    return Ok(adapter.clone());
                }
                (entry.config.clone(), entry.version)
            };

            let built = self.factory.build(&config)?;

            let mut state = self.state.write();
            let entry = state
                .entry_mut(id)
                .ok_or_else(|| DispatchError::adapter_not_found(id))?;
            if entry.version != version {
                debug!(adapter = id, "config changed during build, rebuilding");
                continue;
            }
            if let Some(existing) = &entry.adapter {
                return Ok(existing.clone());
            }
            debug!(adapter = id, provider = %config.provider, model = %config.model, "adapter built");
            entry.adapter = Some(built.clone());
            return Ok(built);
        }
    }

    /// Adapter for the configured default id, or the first config
    pub fn get_default(&self) -> DispatchResult<Arc<dyn CompletionAdapter>> {
        let id = self
            .default_id()
            .ok_or_else(|| DispatchError::config("no adapters configured"))?;
        self.get(&id)
    }

    /// Effective default id
    pub fn default_id(&self) -> Option<String> {
        let state = self.state.read();
        state
            .default_id
            .clone()
            .or_else(|| state.entries.first().map(|e| e.config.id.clone()))
    }

    /// Configured ids in declaration order
    pub fn ids(&self) -> Vec<String> {
        self.state
            .read()
            .entries
            .iter()
            .map(|e| e.config.id.clone())
            .collect()
    }

    pub fn config(&self, id: &str) -> Option<AdapterConfig> {
        self.state.read().entry(id).map(|e| e.config.clone())
    }

    /// Ids whose adapter is currently built
    pub fn cached_ids(&self) -> Vec<String> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| e.adapter.is_some())
            .map(|e| e.config.id.clone())
            .collect()
    }

    /// Adapters for `ids`, in the given order
    pub fn adapters(&self, ids: &[String]) -> DispatchResult<Vec<Arc<dyn CompletionAdapter>>> {
        ids.iter().map(|id| self.get(id)).collect()
    }

    /// Build a fallback chain over registry adapters in the given order
    pub fn fallback_chain(
        &self,
        ids: &[String],
        breaker: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> DispatchResult<FallbackChain> {
        breaker.validate()?;
        let config = FallbackConfig::new(self.adapters(ids)?).with_circuit_breaker(breaker);
        Ok(FallbackChain::with_clock(config, clock))
    }
}
