//! HTTP provider adapters
//!
//! [`HttpAdapter`] owns everything that is the same for every vendor
//! (transport, retries, error mapping, token and cost heuristics); a
//! [`ProviderDialect`] supplies the vendor-specific translation.

pub mod anthropic;
pub mod dialect;
pub mod error_utils;
pub mod google;
pub mod http_adapter;
pub mod openai;
pub mod tokens;


pub use anthropic::AnthropicDialect;
pub use dialect::{ParsedCompletion, ProviderDialect};
pub use google::GoogleDialect;
pub use http_adapter::HttpAdapter;
pub use openai::OpenAiDialect;

use crate::config::{AdapterConfig, Provider};
use crate::error::DispatchResult;
use crate::llm::adapter::{AdapterFactory, CompletionAdapter};
use crate::recovery::clock::{Clock, TokioClock};
use reqwest::Client;
use std::sync::Arc;

/// Default factory: picks the dialect from the configured provider
#[derive(Clone)]
pub struct HttpAdapterFactory {
    client: Client,
    clock: Arc<dyn Clock>,
}

impl HttpAdapterFactory {
    pub fn new() -> DispatchResult<Self> {
        Ok(Self::with_client(http_adapter::default_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn adapter<D: ProviderDialect>(&self, config: &AdapterConfig, dialect: D) -> Arc<dyn CompletionAdapter> {
        Arc::new(
            HttpAdapter::with_client(config.clone(), dialect, self.client.clone())
                .with_clock(self.clock.clone()),
        )
    }
}

impl AdapterFactory for HttpAdapterFactory {
    fn build(&self, config: &AdapterConfig) -> DispatchResult<Arc<dyn CompletionAdapter>> {
        config.validate()?;
        Ok(match config.provider {
            Provider::Anthropic => self.adapter(config, AnthropicDialect),
            Provider::OpenAi => self.adapter(config, OpenAiDialect),
            Provider::Google => self.adapter(config, GoogleDialect),
        })
    }
}
