//! Hot reload of the adapter registry when the config file changes

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use relay_core::RelayConfig;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::console::CliConsole;
use crate::context;

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Keep a registry in sync with the config file until Ctrl-C
pub async fn run(path: PathBuf, config: RelayConfig, verbose: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(verbose);
    console.print_header("Watching Configuration");

    let registry = context::build_registry(&config)?;
    super::print_health(&registry.health_check().await);

    let path = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()?.join(path)
    };
    let dir = path
        .parent()
        .map(PathBuf::from)
        .context("config path has no parent directory")?;
    let file_name = path.file_name().map(|n| n.to_os_string());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| match result {
        Ok(events) => {
            let touched = events
                .iter()
                .any(|event| event.path.file_name().map(|n| n.to_os_string()) == file_name);
            if touched {
                let _ = tx.send(());
            }
        }
        Err(e) => error!("watch error: {:?}", e),
    })?;
    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;

    info!(path = %path.display(), "watching config file");
    console.success(&format!("Watching {} (Ctrl-C to stop)", path.display()));

    loop {
        tokio::select! {
            changed = rx.recv() => {
                if changed.is_none() {
                    break;
                }
                debug!("config file changed");
                let reloaded = match context::load_config(&path) {
                    Ok(config) => registry
                        .reload(config.registry_config())
                        .await
                        .map_err(anyhow::Error::from),
                    Err(e) => Err(e),
                };
                match reloaded {
                    Ok(health) => {
                        console.success(&format!("Reloaded {} adapters", registry.len()));
                        if !health.is_empty() {
                            println!("  health before reload:");
                            super::print_health(&health);
                        }
                    }
                    Err(e) => console.error(&format!("Reload failed, keeping previous config: {:#}", e)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                console.info("Stopping watcher");
                break;
            }
        }
    }
    Ok(())
}
