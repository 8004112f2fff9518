//! Configuration management commands

use std::path::Path;

use relay_core::RelayConfig;

use crate::console::CliConsole;
use crate::context;

/// Validate the configuration and print a summary
pub fn validate(path: &Path, config: &RelayConfig) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Validation");

    if !path.exists() {
        console.warn(&format!(
            "Configuration file not found: {}; defaults are valid but empty",
            path.display()
        ));
    } else {
        console.success(&format!("{} is valid", path.display()));
    }

    console.print_separator();
    console.field("Adapters", config.adapters.len());
    console.field("Fallback order", config.fallback_order().join(" -> "));
    console.field(
        "Default adapter",
        config.default_adapter_id.as_deref().unwrap_or("(first configured)"),
    );
    console.field(
        "Breaker threshold",
        config.fallback.circuit_breaker.failure_threshold,
    );
    console.field(
        "Breaker cooldown",
        format!("{} ms", config.fallback.circuit_breaker.reset_timeout_ms),
    );
    Ok(())
}

/// Print why the configuration could not be loaded, then fail
pub fn report_invalid(path: &Path, error: anyhow::Error) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration Validation");
    console.error(&format!("{} is invalid", path.display()));
    for cause in error.chain().skip(1) {
        console.error(&format!("  caused by: {}", cause));
    }
    Err(error)
}

/// Print the loaded configuration with credentials masked
pub fn show(path: &Path, config: &RelayConfig) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Configuration");

    if path.exists() {
        console.success(&format!("Loaded configuration from: {}", path.display()));
    } else {
        console.warn(&format!("Configuration file not found: {}", path.display()));
        console.info("Using default configuration");
    }

    println!("{}", serde_json::to_string_pretty(&context::masked(config))?);
    Ok(())
}
