//! Health command implementation

use crate::console::CliConsole;
use crate::context;
use relay_core::RelayConfig;

/// Probe every configured adapter
pub async fn run(config: &RelayConfig) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    console.print_header("Adapter Health");

    let registry = context::build_registry(config)?;
    if registry.is_empty() {
        console.warn("No adapters configured");
        return Ok(());
    }

    let health = registry.health_check().await;
    super::print_health(&health);

    let healthy = health.values().filter(|h| **h).count();
    println!();
    if healthy == 0 {
        anyhow::bail!("no adapter is healthy");
    }
    console.success(&format!("{}/{} adapters healthy", healthy, health.len()));
    Ok(())
}
