//! Status command implementation

use colored::*;
use relay_core::{CircuitState, RelayConfig};

use crate::console::CliConsole;
use crate::context;

/// Print the fallback chain in priority order with breaker state
pub async fn run(config: &RelayConfig, probe: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Fallback Chain");

    let registry = context::build_registry(config)?;
    let chain = context::build_chain(&registry, config, None)?;

    let breaker = &config.fallback.circuit_breaker;
    console.field(
        "Breaker",
        format!(
            "opens after {} failures, cooldown {} ms, {} half-open trial(s)",
            breaker.failure_threshold, breaker.reset_timeout_ms, breaker.half_open_max_calls
        ),
    );
    println!();

    for (position, entry) in chain.status().iter().enumerate() {
        let state = match entry.state {
            CircuitState::Closed => entry.state.to_string().green(),
            CircuitState::HalfOpen => entry.state.to_string().yellow(),
            CircuitState::Open => entry.state.to_string().red(),
        };
        println!(
            "  {}. {:<20} {:<10} {:<28} {}",
            position + 1,
            entry.id.bold(),
            entry.provider,
            entry.model,
            state
        );
    }

    if probe {
        println!();
        match chain.healthy_adapter().await {
            Some(adapter) => console.success(&format!("first healthy adapter: {}", adapter.id())),
            None => console.error("no healthy adapter in the chain"),
        }
    }
    Ok(())
}
