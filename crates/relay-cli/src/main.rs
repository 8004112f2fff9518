//! Relay CLI
//!
//! Operational front end for the dispatch layer: probe adapter health, run
//! completions through the configured fallback chain, inspect and validate
//! configuration, and hot-reload the registry when the config file changes.
//!
//! ```bash
//! relay health
//! relay complete "Split this requirement into features"
//! relay stream --adapter claude "Summarize the release notes"
//! relay config validate --config ~/relay.toml
//! relay watch
//! ```

mod args;
mod commands;
mod console;
mod context;
mod logging;
mod router;

use clap::Parser;

pub use args::{Cli, Commands, ConfigAction, PromptArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    router::route(cli).await
}
