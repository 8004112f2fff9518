//! Builder for creating fallback chains

use std::sync::Arc;

use super::manager::FallbackChain;
use super::types::FallbackConfig;
use crate::llm::adapter::CompletionAdapter;
use crate::recovery::{CircuitBreakerConfig, Clock, TokioClock};

/// Builder for creating fallback chains
pub struct FallbackChainBuilder {
    config: FallbackConfig,
    clock: Arc<dyn Clock>,
}

impl FallbackChainBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: FallbackConfig::new(Vec::new()),
            clock: TokioClock::shared(),
        }
    }

    /// Append an adapter; earlier adapters have higher priority
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, adapter: Arc<dyn CompletionAdapter>) -> Self {
        self.config.adapters.push(adapter);
        self
    }

    /// Append several adapters in order
    pub fn adapters(mut self, adapters: impl IntoIterator<Item = Arc<dyn CompletionAdapter>>) -> Self {
        self.config.adapters.extend(adapters);
        self
    }

    /// Breaker settings applied to every entry
    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.config.circuit_breaker = config;
        self
    }

    /// Set max history size
    pub fn max_history(mut self, max: usize) -> Self {
        self.config.history_limit = max;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the fallback chain
    pub fn build(self) -> FallbackChain {
        FallbackChain::with_clock(self.config, self.clock)
    }
}

impl Default for FallbackChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<FallbackConfig> for FallbackChainBuilder {
    fn from(config: FallbackConfig) -> Self {
        Self {
            config,
            clock: TokioClock::shared(),
        }
    }
}
