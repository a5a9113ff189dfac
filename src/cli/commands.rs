//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Concurrent partitioned-stream reader
#[derive(Parser, Debug)]
#[command(name = "streamfan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source definition file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read data from streams
    Read {
        /// Streams to read (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,

        /// Override the worker count
        #[arg(short, long)]
        workers: Option<usize>,

        /// Override how many streams generate partitions at once
        #[arg(long)]
        max_generators: Option<usize>,
    },

    /// Validate source definition
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
