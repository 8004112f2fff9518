//! Heuristic token counting
//!
//! Roughly four characters per token for English text. Good enough for
//! budgeting and cost estimates; not a tokenizer.

use crate::llm::messages::CompletionRequest;

const CHARS_PER_TOKEN: u64 = 4;
const MESSAGE_OVERHEAD_TOKENS: u64 = 4;

/// Estimated tokens in `text`: ceil(chars / 4)
pub fn estimate_text_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(CHARS_PER_TOKEN)
}

/// Estimated prompt tokens of a whole request
pub fn estimate_request_tokens(request: &CompletionRequest) -> u64 {
    let messages: u64 = request
        .messages
        .iter()
        .map(|m| MESSAGE_OVERHEAD_TOKENS + estimate_text_tokens(&m.content))
        .sum();
    let system = request
        .system
        .as_deref()
        .map(estimate_text_tokens)
        .unwrap_or(0);
    let tools: u64 = request
        .tools
        .iter()
        .map(|t| {
            estimate_text_tokens(&t.name)
                + estimate_text_tokens(&t.description)
                + estimate_text_tokens(&t.input_schema.to_string())
        })
        .sum();

    messages + system + tools
}
