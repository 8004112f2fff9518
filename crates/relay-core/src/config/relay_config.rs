//! Top-level configuration

use super::adapter::AdapterConfig;
use super::logging_config::LoggingConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::recovery::circuit_breaker::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default number of fallback events a chain remembers
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

/// What the registry tracks: the adapter configs and an optional default id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_adapter_id: Option<String>,
}

impl RegistryConfig {
    pub fn new(adapters: Vec<AdapterConfig>) -> Self {
        Self {
            adapters,
            default_adapter_id: None,
        }
    }

    pub fn with_default(mut self, id: impl Into<String>) -> Self {
        self.default_adapter_id = Some(id.into());
        self
    }

    /// Reject configs the registry could not serve from
    pub fn validate(&self) -> DispatchResult<()> {
        let mut seen = HashSet::new();
        for adapter in &self.adapters {
            adapter.validate()?;
            if !seen.insert(adapter.id.as_str()) {
                return Err(DispatchError::config(format!(
                    "duplicate adapter id: {}",
                    adapter.id
                )));
            }
        }

        if let Some(default_id) = &self.default_adapter_id {
            if !seen.contains(default_id.as_str()) {
                return Err(DispatchError::config_with_context(
                    format!("default adapter '{}' is not configured", default_id),
                    format!("{} adapters configured", self.adapters.len()),
                ));
            }
        }

        Ok(())
    }
}

/// Fallback chain settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackSettings {
    /// Adapter ids in priority order; empty means declaration order
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            circuit_breaker: CircuitBreakerConfig::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Everything a `relay.toml` file can hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub adapters: Vec<AdapterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_adapter_id: Option<String>,
    #[serde(default)]
    pub fallback: FallbackSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// The part of the config the registry consumes
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            adapters: self.adapters.clone(),
            default_adapter_id: self.default_adapter_id.clone(),
        }
    }

    /// Adapter ids in fallback priority order
    pub fn fallback_order(&self) -> Vec<String> {
        if self.fallback.order.is_empty() {
            self.adapters.iter().map(|a| a.id.clone()).collect()
        } else {
            self.fallback.order.clone()
        }
    }

    pub fn validate(&self) -> DispatchResult<()> {
        self.registry_config().validate()?;
        self.fallback.circuit_breaker.validate()?;

        for id in &self.fallback.order {
            if !self.adapters.iter().any(|a| &a.id == id) {
                return Err(DispatchError::config_with_context(
                    format!("fallback order references unknown adapter '{}'", id),
                    "fallback.order",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    fn adapter(id: &str) -> AdapterConfig {
        AdapterConfig::new(id, Provider::Anthropic, "claude-haiku-4-5")
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let config = RegistryConfig::new(vec![adapter("a"), adapter("a")]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate adapter id"));
    }

    #[test]
    fn test_unknown_default_rejected() {
        let config = RegistryConfig::new(vec![adapter("a")]).with_default("b");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_order_defaults_to_declaration_order() {
        let config = RelayConfig {
            adapters: vec![adapter("a"), adapter("b")],
            ..Default::default()
        };
        assert_eq!(config.fallback_order(), vec!["a", "b"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fallback_order_unknown_id_rejected() {
        let mut config = RelayConfig {
            adapters: vec![adapter("a")],
            ..Default::default()
        };
        config.fallback.order = vec!["a".to_string(), "ghost".to_string()];
        assert!(config.validate().is_err());
    }
}
