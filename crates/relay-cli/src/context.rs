//! Shared setup for commands: config loading, registry and chain construction

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use relay_core::config::{Credential, load_from_file};
use relay_core::{AdapterRegistry, FallbackChain, FallbackChainBuilder, RelayConfig};

/// Expand `~` and environment variables in a config path
pub fn expand_config_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::full(raw).map_or_else(|_| raw.to_string(), |p| p.into_owned()))
}

/// Load and validate the config file; a missing file yields the defaults
pub fn load_config(path: &Path) -> anyhow::Result<RelayConfig> {
    let config = load_from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config in {}", path.display()))?;
    Ok(config)
}

/// Registry initialized from `config`
pub fn build_registry(config: &RelayConfig) -> anyhow::Result<AdapterRegistry> {
    let registry = AdapterRegistry::with_http_factory()?;
    registry.initialize(config.registry_config())?;
    Ok(registry)
}

/// Fallback chain in configured order, or just `only` when given
pub fn build_chain(
    registry: &AdapterRegistry,
    config: &RelayConfig,
    only: Option<&str>,
) -> anyhow::Result<FallbackChain> {
    let order = match only {
        Some(id) => vec![id.to_string()],
        None => config.fallback_order(),
    };
    if order.is_empty() {
        bail!("no adapters configured; add [[adapters]] entries to the config file");
    }

    Ok(FallbackChainBuilder::new()
        .adapters(registry.adapters(&order)?)
        .circuit_breaker(config.fallback.circuit_breaker)
        .max_history(config.fallback.history_limit)
        .build())
}

/// Copy of `config` safe to print
pub fn masked(config: &RelayConfig) -> RelayConfig {
    let mut masked = config.clone();
    for adapter in &mut masked.adapters {
        adapter.credential = adapter
            .credential
            .as_ref()
            .map(|credential| Credential::new(credential.masked()));
    }
    masked
}
