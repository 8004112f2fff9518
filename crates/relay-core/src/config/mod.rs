//! Configuration for adapters, the registry and the CLI
//!
//! Adapters are declared in a [`RelayConfig`] file (TOML, YAML or JSON); the
//! registry consumes the [`RegistryConfig`] view of it.

pub mod adapter;
pub mod credential;
pub mod file_loader;
pub mod logging_config;
pub mod relay_config;

pub use adapter::{AdapterConfig, AdapterConfigPatch, Provider, RateLimitHint};
pub use credential::Credential;
pub use file_loader::load_from_file;
pub use logging_config::{LogFormat, LoggingConfig};
pub use relay_config::{FallbackSettings, RegistryConfig, RelayConfig};
