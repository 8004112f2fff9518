//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "relay.toml";

#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Relay - resilient multi-provider LLM completion dispatch")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE, env = "RELAY_CONFIG")]
    pub config: String,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe every configured adapter
    Health,

    /// Run one completion through the fallback chain
    Complete(PromptArgs),

    /// Stream a completion through the fallback chain
    Stream(PromptArgs),

    /// Show the fallback chain and its circuit breakers
    Status {
        /// Also probe adapters and report the first healthy one
        #[arg(long)]
        probe: bool,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Reload the registry whenever the config file changes
    Watch,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Validate configuration file for errors
    Validate,

    /// Display the loaded configuration with secrets masked
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct PromptArgs {
    /// User prompt
    pub prompt: String,

    /// Use only this adapter instead of the fallback chain
    #[arg(long, short)]
    pub adapter: Option<String>,

    /// System prompt
    #[arg(long, short)]
    pub system: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_args() {
        let cli = Cli::try_parse_from([
            "relay",
            "complete",
            "hello",
            "--adapter",
            "claude",
            "--max-tokens",
            "256",
        ])
        .unwrap();

        assert_eq!(cli.config, DEFAULT_CONFIG_FILE);
        match cli.command {
            Commands::Complete(args) => {
                assert_eq!(args.prompt, "hello");
                assert_eq!(args.adapter.as_deref(), Some("claude"));
                assert_eq!(args.max_tokens, Some(256));
                assert!(args.system.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["relay", "config", "show", "--config", "/tmp/r.yaml", "-v"])
                .unwrap();
        assert_eq!(cli.config, "/tmp/r.yaml");
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn test_prompt_is_required() {
        assert!(Cli::try_parse_from(["relay", "stream"]).is_err());
    }
}
