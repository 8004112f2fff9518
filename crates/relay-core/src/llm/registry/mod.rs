//! Adapter registry
//!
//! Holds adapter configs and lazily builds, caches and evicts the adapters
//! made from them. The registry is an ordinary value: construct one and pass
//! it to whatever needs adapters.

mod lifecycle;
mod lookup;
mod types;

#[cfg(test)]
mod tests;

pub use types::AdapterRegistry;
