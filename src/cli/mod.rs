//! CLI module
//!
//! This module defines the command-line interface using clap and implements
//! the command execution logic.

use crate::{Config, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;
pub mod output;

/// PLC process-model miner CLI
#[derive(Parser, Debug)]
#[command(name = "plc-state-miner")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge per-PLC captures and synthesize the derived columns
    Prepare {
        /// Directory containing the per-PLC capture CSV files
        #[arg(short, long)]
        directory: PathBuf,

        /// Capture file names to include (default: every .csv)
        #[arg(short, long, num_args = 1..)]
        plcs: Vec<String>,

        /// Output file for the enriched invariant-miner dataset; the
        /// process-mining dataset lands next to it with a _TS suffix
        #[arg(short, long)]
        output: PathBuf,

        /// Slope window in rows (overrides the configured value)
        #[arg(short, long)]
        granularity: Option<usize>,

        /// Rows to skip from the start of every capture
        #[arg(long, default_value = "0")]
        skip_rows: usize,

        /// Number of rows to keep after skipping
        #[arg(long)]
        rows: Option<usize>,
    },

    /// Classify dataset columns into actuators, sensors and constants
    Classify {
        /// Register readings CSV file
        #[arg(short, long)]
        dataset: PathBuf,

        /// Invariant report source
        #[arg(short, long, value_enum, default_value = "daikon")]
        source: SourceType,

        /// Saved raw report (required with --source report)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Resolve and print the relational facts of a dataset
    Invariants {
        /// Register readings CSV file
        #[arg(short, long)]
        dataset: PathBuf,

        /// Invariant report source
        #[arg(short, long, value_enum, default_value = "daikon")]
        source: SourceType,

        /// Saved raw report (required with --source report)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Mine the state-transition model from a dataset
    Mine {
        /// Register readings CSV file
        #[arg(short, long)]
        dataset: PathBuf,

        /// Invariant report source
        #[arg(short, long, value_enum, default_value = "daikon")]
        source: SourceType,

        /// Saved raw report (required with --source report)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Sensor whose statistics label the transitions
        #[arg(long)]
        sensor: Option<String>,

        /// Write the raw transition statistics to this JSON file
        #[arg(long)]
        save: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Analyze captured network flows between PLCs
    Network {
        /// Single flow CSV file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Directory of flow CSV files, merged in name order
        #[arg(long)]
        directory: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
}

/// Invariant report source types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceType {
    /// Run the external Daikon toolchain
    Daikon,
    /// Read a previously saved raw report
    Report,
    /// Canned data for testing
    Mock,
}

/// Output format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text table
    Table,
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// DOT format (Graphviz)
    Dot,
}

/// Execute the CLI command
pub async fn execute(args: Cli, config: Config) -> Result<()> {
    match args.command {
        Commands::Prepare { .. } => commands::prepare::execute(args, config),
        Commands::Classify { .. } => commands::classify::execute(args, config).await,
        Commands::Invariants { .. } => commands::invariants::execute(args, config).await,
        Commands::Mine { .. } => commands::mine::execute(args, config).await,
        Commands::Network { .. } => commands::network::execute(args, config),
    }
}
