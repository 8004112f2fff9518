//! Credential references
//!
//! A credential in configuration is either a literal secret or a reference of
//! the form `env:NAME`, resolved from the process environment when an adapter
//! is built. When an adapter has no credential the provider's conventional
//! environment variables are consulted instead.

use super::adapter::Provider;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "env:";

/// Opaque secret reference
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a literal secret or an `env:NAME` reference
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reference an environment variable
    pub fn from_env(var: impl AsRef<str>) -> Self {
        Self(format!("{}{}", ENV_PREFIX, var.as_ref()))
    }

    /// Environment variable this credential points at, if it is a reference
    pub fn env_var(&self) -> Option<&str> {
        self.0.strip_prefix(ENV_PREFIX)
    }

    /// Resolve the secret value
    pub fn resolve(&self) -> Option<String> {
        match self.env_var() {
            Some(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
            None if self.0.is_empty() => None,
            None => Some(self.0.clone()),
        }
    }

    /// Display-safe form
    pub fn masked(&self) -> String {
        match self.env_var() {
            Some(var) => format!("{}{}", ENV_PREFIX, var),
            None => mask_secret(&self.0),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

/// Mask a secret for display, keeping a short prefix and suffix
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Environment variables checked, in order, when no credential is configured
pub fn default_env_vars(provider: Provider) -> Vec<String> {
    let mut vars = vec![format!("RELAY_{}_API_KEY", provider.as_str().to_uppercase())];
    match provider {
        Provider::Anthropic => vars.push("ANTHROPIC_API_KEY".to_string()),
        Provider::OpenAi => vars.push("OPENAI_API_KEY".to_string()),
        Provider::Google => {
            vars.push("GOOGLE_API_KEY".to_string());
            vars.push("GEMINI_API_KEY".to_string());
        }
    }
    vars
}

/// Resolve the API key for an adapter
pub fn resolve_api_key(credential: Option<&Credential>, provider: Provider) -> Option<String> {
    if let Some(credential) = credential {
        return credential.resolve();
    }
    default_env_vars(provider)
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
}
