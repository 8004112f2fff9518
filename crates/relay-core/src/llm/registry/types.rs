//! Core AdapterRegistry type definition

use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::AdapterConfig;
use crate::error::DispatchResult;
use crate::llm::adapter::{AdapterFactory, CompletionAdapter};
use crate::llm::providers::HttpAdapterFactory;

/// A config row and the adapter built from it, if any
pub(super) struct RegistryEntry {
    pub config: AdapterConfig,
    pub adapter: Option<Arc<dyn CompletionAdapter>>,
    /// Generation in which `config` was stored
    pub version: u64,
}

#[derive(Default)]
pub(super) struct RegistryState {
    /// Entries in declaration order
    pub entries: Vec<RegistryEntry>,
    pub default_id: Option<String>,
    /// Bumped on every config change
    pub generation: u64,
}

impl RegistryState {
    pub fn entry(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.config.id == id)
    }

    pub fn entry_mut(&mut self, id: &str) -> Option<&mut RegistryEntry> {
        self.entries.iter_mut().find(|e| e.config.id == id)
    }

    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}

/// Registry of adapter configs with lazily built, cached adapters
pub struct AdapterRegistry {
    pub(super) factory: Arc<dyn AdapterFactory>,
    pub(super) state: RwLock<RegistryState>,
}

impl AdapterRegistry {
    /// Create an empty registry that builds adapters with `factory`
    pub fn new(factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            factory,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Create an empty registry backed by the HTTP provider adapters
    pub fn with_http_factory() -> DispatchResult<Self> {
        Ok(Self::new(Arc::new(HttpAdapterFactory::new()?)))
    }

    /// Number of configured adapters
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        let ids: Vec<&str> = state.entries.iter().map(|e| e.config.id.as_str()).collect();
        f.debug_struct("AdapterRegistry")
            .field("adapters", &ids)
            .field("default_id", &state.default_id)
            .field("generation", &state.generation)
            .finish()
    }
}
