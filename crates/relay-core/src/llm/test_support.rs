//! Scripted adapters for dispatch tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::config::Provider;
use crate::error::{DispatchError, DispatchResult};
use crate::llm::adapter::CompletionAdapter;
use crate::llm::messages::{CompletionRequest, CompletionResponse, FinishReason};
use crate::llm::streaming::{CompletionStream, StreamChunk};
use crate::types::TokenUsage;

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct FakeAdapter {
    id: String,
    provider: Provider,
    outcome: Result<String, DispatchError>,
    chunks: Option<Vec<StreamChunk>>,
    health: Result<bool, DispatchError>,
    tokens: u64,
    cost: f64,
    log: CallLog,
    pub complete_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
}

impl FakeAdapter {
    fn new(id: &str, outcome: Result<String, DispatchError>) -> Self {
        Self {
            id: id.to_string(),
            provider: Provider::OpenAi,
            outcome,
            chunks: None,
            health: Ok(true),
            tokens: 0,
            cost: 0.0,
            log: CallLog::default(),
            complete_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
        }
    }

    pub fn ok(id: &str, text: &str) -> Self {
        Self::new(id, Ok(text.to_string()))
    }

    /// Streams `parts` as content chunks and finishes cleanly
    pub fn default_stream(id: &str, parts: &[&str]) -> Arc<FakeAdapter> {
        let mut chunks: Vec<StreamChunk> = parts.iter().map(|p| StreamChunk::content(*p)).collect();
        chunks.push(StreamChunk::done(
            Some(TokenUsage::new(4, 2)),
            FinishReason::Stop,
        ));
        Self::ok(id, &parts.concat()).chunks(chunks).build()
    }

    pub fn failing(id: &str, message: &str) -> Self {
        Self::new(id, Err(DispatchError::provider("openai", Some(500), message)))
    }

    pub fn failing_with(id: &str, error: DispatchError) -> Self {
        Self::new(id, Err(error))
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = provider;
        self
    }

    pub fn chunks(mut self, chunks: Vec<StreamChunk>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    pub fn health(mut self, health: Result<bool, DispatchError>) -> Self {
        self.health = health;
        self
    }

    pub fn estimates(mut self, tokens: u64, cost: f64) -> Self {
        self.tokens = tokens;
        self.cost = cost;
        self
    }

    pub fn log(mut self, log: &CallLog) -> Self {
        self.log = log.clone();
        self
    }

    pub fn build(self) -> Arc<FakeAdapter> {
        Arc::new(self)
    }

    pub fn completes(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn streams(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    fn script(&self) -> Vec<StreamChunk> {
        if let Some(chunks) = &self.chunks {
            return chunks.clone();
        }
        match &self.outcome {
            Ok(text) => vec![
                StreamChunk::content(text.clone()),
                StreamChunk::done(Some(TokenUsage::new(1, 1)), FinishReason::Stop),
            ],
            Err(e) => vec![StreamChunk::error(e.to_string())],
        }
    }
}

#[async_trait]
impl CompletionAdapter for FakeAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn provider(&self) -> Provider {
        self.provider
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, _request: &CompletionRequest) -> DispatchResult<CompletionResponse> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("complete:{}", self.id));
        match &self.outcome {
            Ok(text) => Ok(CompletionResponse::text(self.provider, "fake-model", text.clone())),
            Err(e) => Err(e.clone()),
        }
    }

    fn stream<'a>(&'a self, _request: &'a CompletionRequest) -> CompletionStream<'a> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("stream:{}", self.id));
        Box::pin(futures::stream::iter(self.script()))
    }

    fn count_tokens(&self, _text: &str) -> u64 {
        self.tokens
    }

    fn estimate_cost(&self, _usage: &TokenUsage) -> f64 {
        self.cost
    }

    async fn health_check(&self) -> DispatchResult<bool> {
        self.health.clone()
    }
}

/// Upcast for chain construction
pub fn dyn_adapters(adapters: &[&Arc<FakeAdapter>]) -> Vec<Arc<dyn CompletionAdapter>> {
    adapters
        .iter()
        .map(|a| Arc::clone(*a) as Arc<dyn CompletionAdapter>)
        .collect()
}
