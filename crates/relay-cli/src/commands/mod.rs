//! CLI command implementations

pub mod complete;
pub mod config;
pub mod health;
pub mod status;
pub mod watch;

use colored::*;
use std::collections::BTreeMap;

/// Print a per-adapter health map
pub(crate) fn print_health(health: &BTreeMap<String, bool>) {
    for (id, healthy) in health {
        let mark = if *healthy {
            "healthy".green()
        } else {
            "unhealthy".red()
        };
        println!("  {:<24} {}", id, mark);
    }
}
