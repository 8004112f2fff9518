//! Cost estimation
//!
//! Costs are estimates from a built-in price list; they are advisory and
//! never used for routing decisions.

pub mod pricing;

pub use pricing::{ModelPricing, PricingTable, TokenPrice};
