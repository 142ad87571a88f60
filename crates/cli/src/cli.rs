//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::LogLevel;
use std::path::PathBuf;

/// fndispatch - dispatch tasks to the replicas of a serverless function
#[derive(Parser, Debug)]
#[command(
    name = "fndispatch",
    author,
    version,
    about = "Dispatch tasks to function replicas over HTTP",
    long_about = "Sends task bodies to the replicas of one logical function.\n\n\
                  `invoke` calls a single address directly; `dispatch` spreads many \n\
                  tasks over every replica listed in a configuration file."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FNDISPATCH_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FNDISPATCH_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one task to one replica address and print the result
    Invoke(InvokeArgs),

    /// Dispatch many tasks across the replicas of a configured function
    Dispatch(DispatchArgs),

    /// Validate configuration file without dispatching
    Validate(ValidateArgs),
}

/// Arguments for the `invoke` command
#[derive(Parser, Debug, Clone)]
pub struct InvokeArgs {
    /// Replica address (host:port or URL)
    #[arg(short, long, env = "FNDISPATCH_ADDRESS")]
    pub address: String,

    /// HTTP method
    #[arg(short, long, default_value = "PUT")]
    pub method: String,

    /// Log level requested from the replica
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,

    /// Request body
    #[arg(short, long, default_value = "")]
    pub body: String,

    /// File the response body is written to
    #[arg(short, long, default_value = "/tmp/output")]
    pub output: PathBuf,
}

/// Arguments for the `dispatch` command
#[derive(Parser, Debug, Clone)]
pub struct DispatchArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "dispatch.toml",
        env = "FNDISPATCH_CONFIG"
    )]
    pub config: PathBuf,

    /// File with one task body per line
    #[arg(long, conflicts_with = "body")]
    pub input: Option<PathBuf>,

    /// Body sent `count` times when no input file is given
    #[arg(long, default_value = "")]
    pub body: String,

    /// Number of tasks built from `body`
    #[arg(long, default_value = "1")]
    pub count: usize,

    /// Directory each response body is written to (`<sequence>.out`)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Give up waiting for responses after this many seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "FNDISPATCH_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "FNDISPATCH_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "dispatch.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
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

impl Cli {
    /// Logging configuration derived from the global flags
    pub fn log_config(&self) -> observability::LogConfig {
        observability::LogConfig::from_verbosity(
            self.verbose,
            self.quiet,
            self.log_format.clone().into(),
        )
    }
}
