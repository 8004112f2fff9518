//! Model pricing definitions

use crate::config::Provider;
use crate::types::TokenUsage;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Price per 1M tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenPrice {
    /// Price per 1M input tokens (USD)
    pub input: f64,
    /// Price per 1M output tokens (USD)
    pub output: f64,
}

impl TokenPrice {
    pub const fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Calculate cost for given token counts
    pub fn calculate(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input_cost = (input_tokens as f64 / 1_000_000.0) * self.input;
        let output_cost = (output_tokens as f64 / 1_000_000.0) * self.output;
        input_cost + output_cost
    }
}

/// Price of one model family, matched by model-name prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub model_prefix: String,
    pub provider: Provider,
    pub price: TokenPrice,
}

impl ModelPricing {
    pub fn new(model_prefix: impl Into<String>, provider: Provider, price: TokenPrice) -> Self {
        Self {
            model_prefix: model_prefix.into(),
            provider,
            price,
        }
    }

    /// Calculate cost for given usage
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        self.price
            .calculate(usage.prompt_tokens as u64, usage.completion_tokens as u64)
    }
}

/// Price list keyed by model-name prefix
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    entries: Vec<ModelPricing>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared table of built-in list prices
    pub fn builtin() -> &'static PricingTable {
        &BUILTIN
    }

    pub fn register(&mut self, pricing: ModelPricing) {
        self.entries.push(pricing);
    }

    /// Pricing whose prefix is the longest match for `model`
    pub fn lookup(&self, model: &str) -> Option<&ModelPricing> {
        let model = model.to_ascii_lowercase();
        self.entries
            .iter()
            .filter(|p| model.starts_with(&p.model_prefix))
            .max_by_key(|p| p.model_prefix.len())
    }

    /// Estimated cost; unknown models cost nothing
    pub fn estimate(&self, model: &str, usage: &TokenUsage) -> f64 {
        self.lookup(model).map(|p| p.cost(usage)).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelPricing> {
        self.entries.iter()
    }
}

static BUILTIN: Lazy<PricingTable> = Lazy::new(|| {
    use Provider::*;

    let mut table = PricingTable::new();
    let rows: &[(&str, Provider, f64, f64)] = &[
        // Anthropic
        ("claude-opus-4", Anthropic, 15.0, 75.0),
        ("claude-sonnet-4", Anthropic, 3.0, 15.0),
        ("claude-haiku-4", Anthropic, 1.0, 5.0),
        ("claude-3-7-sonnet", Anthropic, 3.0, 15.0),
        ("claude-3-5-sonnet", Anthropic, 3.0, 15.0),
        ("claude-3-5-haiku", Anthropic, 0.80, 4.0),
        ("claude-3-opus", Anthropic, 15.0, 75.0),
        ("claude-3-haiku", Anthropic, 0.25, 1.25),
        // OpenAI
        ("gpt-4o", OpenAi, 2.50, 10.0),
        ("gpt-4o-mini", OpenAi, 0.15, 0.60),
        ("gpt-4.1", OpenAi, 2.0, 8.0),
        ("gpt-4.1-mini", OpenAi, 0.40, 1.60),
        ("gpt-4-turbo", OpenAi, 10.0, 30.0),
        ("gpt-3.5-turbo", OpenAi, 0.50, 1.50),
        ("o1", OpenAi, 15.0, 60.0),
        ("o3-mini", OpenAi, 1.10, 4.40),
        // Google
        ("gemini-2.5-pro", Google, 1.25, 10.0),
        ("gemini-2.5-flash", Google, 0.30, 2.50),
        ("gemini-2.0-flash", Google, 0.10, 0.40),
        ("gemini-1.5-pro", Google, 1.25, 5.0),
        ("gemini-1.5-flash", Google, 0.075, 0.30),
    ];
    for &(prefix, provider, input, output) in rows {
        table.register(ModelPricing::new(
            prefix,
            provider,
            TokenPrice::new(input, output),
        ));
    }
    table
});
