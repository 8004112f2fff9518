//! HTTP transport shared by every provider dialect

use super::dialect::ProviderDialect;
use super::error_utils::{handle_http_error, handle_transport_error};
use super::tokens::{estimate_request_tokens, estimate_text_tokens};
use crate::config::credential::resolve_api_key;
use crate::config::{AdapterConfig, Provider};
use crate::cost::PricingTable;
use crate::error::{DispatchError, DispatchResult};
use crate::llm::adapter::CompletionAdapter;
use crate::llm::messages::{CompletionRequest, CompletionResponse};
use crate::llm::sse_decoder::{SseDecoder, SseEvent};
use crate::llm::streaming::{CompletionStream, StreamChunk};
use crate::recovery::clock::{Clock, TokioClock};
use crate::recovery::retry::{RetryObserver, RetryPolicy, RetryTimeout};
use crate::types::TokenUsage;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the HTTP client adapters share
pub fn default_client() -> DispatchResult<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(|e| DispatchError::http(format!("failed to build HTTP client: {}", e)))
}

/// [`CompletionAdapter`] speaking one provider dialect over HTTP
pub struct HttpAdapter<D: ProviderDialect> {
    config: AdapterConfig,
    dialect: D,
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryTimeout,
    clock: Arc<dyn Clock>,
}

impl<D: ProviderDialect> std::fmt::Debug for HttpAdapter<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdapter")
            .field("config", &self.config)
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

impl<D: ProviderDialect> HttpAdapter<D> {
    pub fn new(config: AdapterConfig, dialect: D) -> DispatchResult<Self> {
        Ok(Self::with_client(config, dialect, default_client()?))
    }

    /// Build over an existing client, sharing its connection pool
    pub fn with_client(config: AdapterConfig, dialect: D, client: Client) -> Self {
        let api_key = resolve_api_key(config.credential.as_ref(), config.provider);
        if api_key.is_none() {
            debug!(adapter = %config.id, provider = %config.provider, "no API key resolved");
        }
        let retry = RetryTimeout::new(config.id.clone(), RetryPolicy::from_adapter_config(&config));
        Self {
            base_url: config.effective_base_url(),
            api_key,
            retry,
            clock: Arc::new(TokioClock),
            config,
            dialect,
            client,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.retry = self.retry.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn with_retry_observer(mut self, observer: RetryObserver) -> Self {
        self.retry = self.retry.with_observer(observer);
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        self.dialect
            .headers(&self.config, self.api_key.as_deref())
            .into_iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value))
    }

    async fn post_json(&self, url: &str, body: &Value) -> DispatchResult<Response> {
        let provider = self.dialect.provider();
        let response = self
            .authorized(self.client.post(url).json(body))
            .send()
            .await
            .map_err(|e| handle_transport_error(e, provider))?;

        if !response.status().is_success() {
            return Err(handle_http_error(response, provider).await);
        }
        Ok(response)
    }

    async fn complete_once(
        &self,
        request: &CompletionRequest,
        url: &str,
        body: &Value,
    ) -> DispatchResult<CompletionResponse> {
        let provider = self.dialect.provider();
        let started = self.clock.now();

        let response = self.post_json(url, body).await?;
        let json: Value = response.json().await.map_err(|e| {
            DispatchError::json(format!("failed to decode {} response: {}", provider, e))
        })?;
        let parsed = self.dialect.parse_response(json)?;

        let usage = parsed.usage.unwrap_or_else(|| {
            TokenUsage::new(
                clamp_u32(estimate_request_tokens(request)),
                clamp_u32(estimate_text_tokens(&parsed.content)),
            )
        });

        Ok(CompletionResponse {
            content: parsed.content,
            usage,
            latency_ms: self.clock.now().saturating_duration_since(started).as_millis() as u64,
            finish_reason: parsed.finish_reason,
            tool_calls: parsed.tool_calls,
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
            provider,
        })
    }

    /// Open the streaming request; connecting is retried like `complete`
    async fn open_stream<'a>(&'a self, request: &'a CompletionRequest) -> CompletionStream<'a> {
        let url = self.dialect.completion_url(&self.base_url, &self.config.model, true);
        let body = self.dialect.build_body(&self.config.model, request, true);

        match self.retry.run(|| self.post_json(&url, &body)).await {
            Ok(response) => self.decode_sse(response.bytes_stream()),
            Err(error) => {
                warn!(adapter = %self.config.id, error = %error, "failed to open stream");
                Box::pin(futures::stream::iter([StreamChunk::error(error.to_string())]))
            }
        }
    }

    /// Turn a byte stream of SSE into chunks that end with exactly one terminal chunk
    fn decode_sse<'a, S, B>(&'a self, bytes: S) -> CompletionStream<'a>
    where
        S: Stream<Item = Result<B, reqwest::Error>> + Send + 'a,
        B: AsRef<[u8]> + Send,
    {
        let state = SseState {
            adapter: self,
            bytes: Box::pin(bytes),
            decoder: SseDecoder::new(),
            parser: D::StreamState::default(),
            pending: VecDeque::new(),
            finished: false,
        };

        Box::pin(futures::stream::unfold(state, |mut st| async move {
            loop {
                if let Some(chunk) = st.pending.pop_front() {
                    if chunk.is_terminal() {
                        st.finished = true;
                        st.pending.clear();
                    }
                    return Some((chunk, st));
                }
                if st.finished {
                    return None;
                }
                st.pull().await;
            }
        }))
    }
}

struct SseState<'a, D: ProviderDialect, S> {
    adapter: &'a HttpAdapter<D>,
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    parser: D::StreamState,
    pending: VecDeque<StreamChunk>,
    finished: bool,
}

impl<D, S, B> SseState<'_, D, S>
where
    D: ProviderDialect,
    S: Stream<Item = Result<B, reqwest::Error>>,
    B: AsRef<[u8]> + Send,
{
    /// Read the next network chunk into `pending`
    async fn pull(&mut self) {
        let adapter = self.adapter;
        let provider = adapter.dialect.provider();
        let idle_timeout = adapter.config.timeout();

        let next = {
            let idle = adapter.clock.sleep(idle_timeout);
            tokio::select! {
                biased;
                item = self.bytes.next() => Some(item),
                _ = idle => None,
            }
        };

        match next {
            Some(Some(Ok(bytes))) => {
                for event in self.decoder.feed(bytes.as_ref()) {
                    self.push_event(&event);
                }
            }
            Some(Some(Err(e))) => {
                let error = handle_transport_error(e, provider);
                self.pending.push_back(StreamChunk::error(error.to_string()));
            }
            Some(None) => {
                if let Some(event) = self.decoder.finish() {
                    self.push_event(&event);
                }
                if !self.pending.iter().any(StreamChunk::is_terminal) {
                    let end = adapter
                        .dialect
                        .finish_stream(&mut self.parser)
                        .unwrap_or_else(|| {
                            StreamChunk::error(format!(
                                "{} stream closed before completion",
                                provider
                            ))
                        });
                    self.pending.push_back(end);
                }
            }
            None => {
                let error = DispatchError::timeout(
                    format!("{} stream read", adapter.config.id),
                    idle_timeout.as_millis() as u64,
                );
                self.pending.push_back(StreamChunk::error(error.to_string()));
            }
        }
    }

    fn push_event(&mut self, event: &SseEvent) {
        match self.adapter.dialect.parse_stream_event(&mut self.parser, event) {
            Ok(chunks) => self.pending.extend(chunks),
            Err(e) => self.pending.push_back(StreamChunk::error(format!(
                "{} sent a malformed stream event: {}",
                self.adapter.dialect.provider(),
                e
            ))),
        }
    }
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}

#[async_trait]
impl<D: ProviderDialect> CompletionAdapter for HttpAdapter<D> {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn provider(&self) -> Provider {
        self.dialect.provider()
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, request), fields(adapter = %self.config.id, model = %self.config.model))]
    async fn complete(&self, request: &CompletionRequest) -> DispatchResult<CompletionResponse> {
        let url = self.dialect.completion_url(&self.base_url, &self.config.model, false);
        let body = self.dialect.build_body(&self.config.model, request, false);

        let response = self
            .retry
            .run(|| self.complete_once(request, &url, &body))
            .await?;

        debug!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            latency_ms = response.latency_ms,
            "completion finished"
        );
        Ok(response)
    }

    fn stream<'a>(&'a self, request: &'a CompletionRequest) -> CompletionStream<'a> {
        Box::pin(futures::stream::once(self.open_stream(request)).flatten())
    }

    fn count_tokens(&self, text: &str) -> u64 {
        estimate_text_tokens(text)
    }

    fn estimate_cost(&self, usage: &TokenUsage) -> f64 {
        PricingTable::builtin().estimate(&self.config.model, usage)
    }

    async fn health_check(&self) -> DispatchResult<bool> {
        let provider = self.dialect.provider();
        let url = self.dialect.health_url(&self.base_url, &self.config.model);
        let probe = RetryTimeout::new(
            self.config.id.clone(),
            RetryPolicy::no_retry(self.config.timeout()),
        )
        .with_clock(self.clock.clone());

        let response = probe
            .run(|| async {
                self.authorized(self.client.get(&url))
                    .send()
                    .await
                    .map_err(|e| handle_transport_error(e, provider))
            })
            .await?;

        let healthy = response.status().is_success();
        if !healthy {
            debug!(adapter = %self.config.id, status = %response.status(), "health probe failed");
        }
        Ok(healthy)
    }
}
