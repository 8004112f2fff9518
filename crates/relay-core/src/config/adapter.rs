//! Adapter configuration
//!
//! An [`AdapterConfig`] pins one provider/model pairing together with its
//! retry and timeout policy. It is immutable once an adapter has been built
//! from it; changing it means discarding that adapter and building a new one.

use super::credential::Credential;
use crate::error::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Upstream LLM vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
    Google,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
            Provider::Google => "google",
        }
    }

    /// Default API base URL
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Google => "https://generativelanguage.googleapis.com",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" => Ok(Provider::OpenAi),
            "google" | "gemini" => Ok(Provider::Google),
            other => Err(DispatchError::config(format!("unknown provider: {}", other))),
        }
    }
}

/// Advisory throughput limits published for an adapter.
///
/// The dispatch layer reports these but does not enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateLimitHint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_per_minute: Option<u32>,
}

pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;
pub(crate) const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub(crate) const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_retry_base_delay_ms() -> u64 {
    DEFAULT_RETRY_BASE_DELAY_MS
}

/// Identity and policy for one provider/model pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Caller-assigned unique id
    pub id: String,
    pub provider: Provider,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    /// Overrides the provider's default API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Per-attempt timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Delay before the first retry; later retries double it
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitHint>,
    /// Anthropic `anthropic-version` header override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
}

impl AdapterConfig {
    /// Create a config with default policy
    pub fn new(id: impl Into<String>, provider: Provider, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider,
            model: model.into(),
            credential: None,
            base_url: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            rate_limit: None,
            api_version: None,
        }
    }

    /// Set the credential
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set per-attempt timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the first retry delay
    pub fn with_retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = delay_ms;
        self
    }

    /// Set the advisory rate limit
    pub fn with_rate_limit(mut self, rate_limit: RateLimitHint) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    /// Effective API base URL, without a trailing slash
    pub fn effective_base_url(&self) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_base_url())
            .trim_end_matches('/')
            .to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total attempts the retry wrapper may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Check the config for values no adapter could be built from
    pub fn validate(&self) -> DispatchResult<()> {
        if self.id.trim().is_empty() {
            return Err(DispatchError::config("adapter id must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(DispatchError::config_with_context(
                "model must not be empty",
                format!("adapter '{}'", self.id),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(DispatchError::config_with_context(
                "timeout_ms must be greater than zero",
                format!("adapter '{}'", self.id),
            ));
        }
        Ok(())
    }
}

/// Partial update merged into a stored [`AdapterConfig`].
///
/// The id cannot be changed through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfigPatch {
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub credential: Option<Credential>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retry_base_delay_ms: Option<u64>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitHint>,
    #[serde(default)]
    pub api_version: Option<String>,
}

impl AdapterConfigPatch {
    /// Merge the set fields into `config`
    pub fn apply_to(&self, config: &mut AdapterConfig) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(credential) = &self.credential {
            config.credential = Some(credential.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(delay) = self.retry_base_delay_ms {
            config.retry_base_delay_ms = delay;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = Some(rate_limit);
        }
        if let Some(api_version) = &self.api_version {
            config.api_version = Some(api_version.clone());
        }
    }
}
