//! rustible-oplog - operation-log result sink for Rustible runs
//!
//! Replays recorded runner events through the operation-log callback and
//! prints the effective configuration.

mod cli;

use std::fs::File;
use std::io::{self, BufRead, BufReader};

use anyhow::{Context, Result};
use cli::{Cli, Commands, ConfigFormat, ReplayArgs, ShowConfigArgs};
use rustible_oplog::callback::OperationLogCallback;
use rustible_oplog::config::Config;
use rustible_oplog::replay::replay;
use rustible_oplog::telemetry::{LogLevel, LoggingBuilder};
use rustible_oplog::vars::HostVars;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    init_logging(&cli, &config)?;

    match &cli.command {
        Commands::Replay(args) => run_replay(&cli, config, args).await,
        Commands::ShowConfig(args) => show_config(&config, args),
    }
}

fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let mut logging = config.logging.clone();
    if cli.verbosity() > 0 {
        logging.level = LogLevel::from_verbosity(cli.verbosity());
        logging.with_target = cli.verbosity() >= 2;
        logging.with_file = cli.verbosity() >= 3;
    }
    if let Some(format) = cli.log_format {
        logging.format = format;
    }

    LoggingBuilder::from_config(logging)
        .init()
        .context("Failed to initialize logging")
}

async fn run_replay(cli: &Cli, config: Config, args: &ReplayArgs) -> Result<()> {
    let inventory = match cli.inventory {
        Some(ref path) => HostVars::from_file(path)
            .with_context(|| format!("Failed to load inventory: {}", path.display()))?,
        None => HostVars::new(),
    };

    let callback =
        OperationLogCallback::new(config.callback).context("Invalid callback configuration")?;

    let events: Box<dyn BufRead> = if args.from_stdin() {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&args.events)
            .with_context(|| format!("Failed to open event stream: {}", args.events.display()))?;
        Box::new(BufReader::new(file))
    };

    let summary = match replay(&callback, &inventory, events).await {
        Ok(summary) => summary,
        Err(err) if err.is_network() => {
            let url = callback.config().url.clone();
            return Err(err)
                .with_context(|| format!("Failed to deliver operation log to {}", url));
        }
        Err(err) => return Err(err).context("Replay failed"),
    };

    println!(
        "Replayed {} play(s) and {} host result(s){}",
        summary.plays,
        summary.host_results,
        if summary.flushed { "; run flushed" } else { "" }
    );
    Ok(())
}

fn show_config(config: &Config, args: &ShowConfigArgs) -> Result<()> {
    let rendered = match args.format {
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
