//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Record Bridge - schema-governed stream to REST upsert bridge
#[derive(Parser, Debug)]
#[command(
    name = "record-bridge",
    author,
    version,
    about = "Schema-governed stream to REST upsert bridge",
    long_about = "Consumes union-tagged records from a topic, decodes them against the schema \n\
                  registered for the topic, normalizes and filters them, and upserts every \n\
                  message into a REST sink. Stops on the first failed delivery."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RECORD_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "json",
        global = true,
        env = "RECORD_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "RECORD_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the topic from configuration
    #[arg(long, env = "RECORD_BRIDGE_TOPIC")]
    pub topic: Option<String>,

    /// Override the JSONL capture to replay
    #[arg(long, env = "RECORD_BRIDGE_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Override the delay between replayed records in milliseconds
    #[arg(long, env = "RECORD_BRIDGE_REPLAY_DELAY_MS")]
    pub replay_delay_ms: Option<u64>,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "RECORD_BRIDGE_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "RECORD_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show filter rules
    #[arg(long)]
    pub filters: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "record-bridge",
            "-v",
            "run",
            "--config",
            "bridge.toml",
            "--replay",
            "capture.jsonl",
            "--metrics-port",
            "9000",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("bridge.toml"));
                assert_eq!(args.replay, Some(PathBuf::from("capture.jsonl")));
                assert_eq!(args.metrics_port, 9000);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["record-bridge", "-q", "-v", "validate"]).is_err());
    }
}
