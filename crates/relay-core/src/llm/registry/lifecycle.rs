//! Registry configuration lifecycle and health sweeps

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use super::types::{AdapterRegistry, RegistryEntry};
use crate::config::{AdapterConfig, AdapterConfigPatch, RegistryConfig};
use crate::error::{DispatchError, DispatchResult};
use crate::llm::adapter::CompletionAdapter;

impl AdapterRegistry {
    /// Replace every config and drop every cached adapter
    pub fn initialize(&self, config: RegistryConfig) -> DispatchResult<()> {
        config.validate()?;

        let mut state = self.state.write();
        let version = state.next_generation();
        state.entries = config
            .adapters
            .into_iter()
            .map(|adapter_config| RegistryEntry {
                config: adapter_config,
                adapter: None,
                version,
            })
            .collect();
        state.default_id = config.default_adapter_id;

        info!(
            adapters = state.entries.len(),
            default = ?state.default_id,
            "adapter registry initialized"
        );
        Ok(())
    }

    /// Merge `patch` into the stored config for `id` and evict its adapter
    pub fn update_config(&self, id: &str, patch: &AdapterConfigPatch) -> DispatchResult<AdapterConfig> {
        let mut state = self.state.write();
        let version = state.generation + 1;

        let entry = state
            .entry_mut(id)
            .ok_or_else(|| DispatchError::adapter_not_found(id))?;
        let mut updated = entry.config.clone();
        patch.apply_to(&mut updated);
        updated.validate()?;

        entry.config = updated.clone();
        entry.adapter = None;
        entry.version = version;
        state.generation = version;

        info!(adapter = id, "adapter config updated");
        Ok(updated)
    }

    /// Probe the currently cached adapters, then re-initialize.
    ///
    /// The probe is best effort: failures are logged and reported as
    /// `false` in the returned pre-reload health map.
    pub async fn reload(&self, config: RegistryConfig) -> DispatchResult<BTreeMap<String, bool>> {
        let cached: Vec<(String, Arc<dyn CompletionAdapter>)> = {
            let state = self.state.read();
            state
                .entries
                .iter()
                .filter_map(|e| e.adapter.clone().map(|a| (e.config.id.clone(), a)))
                .collect()
        };

        let health = probe_all(cached).await;
        info!(
            probed = health.len(),
            healthy = health.values().filter(|h| **h).count(),
            "pre-reload health sweep finished"
        );

        self.initialize(config)?;
        Ok(health)
    }

    /// Probe every configured adapter, building it if needed.
    ///
    /// Build or probe failures map to `false`.
    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();
        let mut adapters = Vec::new();

        for id in self.ids() {
            match self.get(&id) {
                Ok(adapter) => adapters.push((id, adapter)),
                Err(e) => {
                    warn!(adapter = %id, error = %e, "could not build adapter for health check");
                    results.insert(id, false);
                }
            }
        }

        results.extend(probe_all(adapters).await);
        results
    }

    /// Drop every config and cached adapter
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.default_id = None;
        state.next_generation();
    }
}

async fn probe_all(adapters: Vec<(String, Arc<dyn CompletionAdapter>)>) -> BTreeMap<String, bool> {
    let probes = adapters.into_iter().map(|(id, adapter)| async move {
        let healthy = match adapter.health_check().await {
            Ok(true) => true,
            Ok(false) => {
                warn!(adapter = %id, "adapter unhealthy");
                false
            }
            Err(e) => {
                warn!(adapter = %id, error = %e, "adapter health check failed");
                false
            }
        };
        (id, healthy)
    });
    join_all(probes).await.into_iter().collect()
}
