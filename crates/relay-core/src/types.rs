//! Common types shared across the dispatch layer

use serde::{Deserialize, Serialize};

/// Token usage statistics for one completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: u32,
    /// Number of tokens in the completion
    pub completion_tokens: u32,
    /// Total number of tokens used
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Add usage from another TokenUsage instance
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_totals() {
        let mut usage = TokenUsage::new(100, 20);
        assert_eq!(usage.total_tokens, 120);

        usage.add(&TokenUsage::new(5, 5));
        assert_eq!(usage.prompt_tokens, 105);
        assert_eq!(usage.completion_tokens, 25);
        assert_eq!(usage.total_tokens, 130);
    }
}
