//! Command routing logic for CLI

use crate::args::{Cli, Commands, ConfigAction};
use crate::{commands, context, logging};
use relay_core::config::LoggingConfig;

/// Load the config, install logging and run the selected command
pub async fn route(cli: Cli) -> anyhow::Result<()> {
    let config_path = context::expand_config_path(&cli.config);

    let config = match context::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&LoggingConfig::default(), cli.verbose);
            if matches!(
                cli.command,
                Commands::Config {
                    action: ConfigAction::Validate
                }
            ) {
                return commands::config::report_invalid(&config_path, e);
            }
            return Err(e);
        }
    };
    logging::init(&config.logging, cli.verbose);
    tracing::debug!(path = %config_path.display(), adapters = config.adapters.len(), "config loaded");

    match cli.command {
        Commands::Health => commands::health::run(&config).await,
        Commands::Complete(args) => commands::complete::run(&config, &args).await,
        Commands::Stream(args) => commands::complete::stream(&config, &args).await,
        Commands::Status { probe } => commands::status::run(&config, probe).await,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config::validate(&config_path, &config),
            ConfigAction::Show => commands::config::show(&config_path, &config),
        },
        Commands::Watch => commands::watch::run(config_path, config, cli.verbose).await,
    }
}
