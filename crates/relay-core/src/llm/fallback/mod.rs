//! Ordered fallback across completion adapters
//!
//! A [`FallbackChain`] pairs every adapter with its own circuit breaker and
//! tries them in priority order until one succeeds, for single-shot and for
//! streaming completions.

mod builder;
mod manager;
mod operations;
mod stream;
mod types;

#[cfg(test)]
mod tests;

pub use builder::FallbackChainBuilder;
pub use manager::FallbackChain;
pub use types::{ChainEntryStatus, FallbackConfig, FallbackEvent, FallbackReason};
