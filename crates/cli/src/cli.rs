//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use observability::ObservabilityConfig;
use std::path::PathBuf;

/// Segment Curator - clinical-label sensor segment extraction
#[derive(Parser, Debug)]
#[command(
    name = "segment-curator",
    author,
    version,
    about = "Curate labelled sensor segments from wearable recordings",
    long_about = "Resolves clinical boundaries and device clock offsets, aligns raw \n\
                  sensor files to the reference clock, cuts zero-based segments and \n\
                  writes an assembled segment table to the configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SEGMENT_CURATOR_VERBOSE")]
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
        env = "SEGMENT_CURATOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Tracing and exporter settings implied by the global flags.
    ///
    /// The metrics exporter is only started for a `run` that is not a dry run.
    pub fn observability_config(&self) -> ObservabilityConfig {
        let config =
            ObservabilityConfig::from_verbosity(self.verbose, self.quiet, self.log_format.into());
        match &self.command {
            Commands::Run(args) if !args.dry_run => config.with_metrics_port(args.metrics_port),
            _ => config,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the curation pipeline
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
        default_value = "curation.toml",
        env = "SEGMENT_CURATOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Override output directory from configuration
    #[arg(short, long, env = "SEGMENT_CURATOR_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Override worker pool size from configuration
    #[arg(long, env = "SEGMENT_CURATOR_POOL_SIZE")]
    pub pool_size: Option<usize>,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SEGMENT_CURATOR_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "curation.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "curation.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed sensor source information
    #[arg(long)]
    pub sources: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
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
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}
