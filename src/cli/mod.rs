//! CLI module for rustible-oplog
//!
//! Argument parsing for replaying recorded runner events through the
//! operation-log callback.

use clap::{Parser, Subcommand, ValueEnum};
use rustible_oplog::telemetry::LogFormat;
use std::path::PathBuf;

/// rustible-oplog - operation-log result sink for Rustible runs
///
/// Writes per-host result logs and reports failures to a collector.
#[derive(Parser, Debug, Clone)]
#[command(name = "rustible-oplog")]
#[command(author = "Rustible Contributors")]
#[command(version)]
#[command(about = "Operation-log result sink for Rustible runs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// YAML inventory providing host variables
    #[arg(short = 'i', long, global = true, env = "RUSTIBLE_OPLOG_INVENTORY")]
    pub inventory: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Diagnostics format
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true, env = "RUSTIBLE_OPLOG_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Replay a JSON-lines event stream through the callback
    Replay(ReplayArgs),

    /// Print the effective configuration
    #[command(name = "show-config")]
    ShowConfig(ShowConfigArgs),
}

/// Arguments for replay command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Event stream file, or `-` for stdin
    pub events: PathBuf,
}

impl ReplayArgs {
    /// Whether events come from stdin
    pub fn from_stdin(&self) -> bool {
        self.events.as_os_str() == "-"
    }
}

/// Arguments for show-config command
#[derive(Parser, Debug, Clone)]
pub struct ShowConfigArgs {
    /// Output format
    #[arg(long, default_value = "toml")]
    pub format: ConfigFormat,
}

/// Serialization used by show-config
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["rustible-oplog", "replay", "events.jsonl"]).unwrap();
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.events, PathBuf::from("events.jsonl"));
                assert!(!args.from_stdin());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "rustible-oplog",
            "-vvvv",
            "--log-format",
            "json",
            "-i",
            "hosts.yml",
            "replay",
            "-",
        ])
        .unwrap();
        assert_eq!(cli.verbosity(), 3);
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(cli.inventory, Some(PathBuf::from("hosts.yml")));
        assert!(matches!(cli.command, Commands::Replay(ref a) if a.from_stdin()));
    }

    #[test]
    fn test_show_config_format() {
        let cli = Cli::try_parse_from(["rustible-oplog", "show-config", "--format", "yaml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::ShowConfig(ShowConfigArgs {
                format: ConfigFormat::Yaml
            })
        ));
    }
}
