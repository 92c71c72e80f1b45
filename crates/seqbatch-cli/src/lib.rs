//! seqbatch CLI Library
//!
//! Batched submission of consensus sequences and their metadata to the
//! VirusSeq data portal.
//!
//! # Overview
//!
//! One invocation runs the whole pipeline:
//!
//! - **Partition**: sort the input and cut it into `<prefix>.<n>.queued.*` batch pairs
//! - **Submit**: upload each queued pair and rename it to its submission id
//! - **Reconcile**: poll submitted pairs and move records that failed
//!   processing back into a queued pair for correction
//! - **Report**: print every batch pair and its state
//!
//! Re-running with the same prefix picks up where the previous run stopped;
//! the batch file names are the only state.

pub mod api;
pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod report;
pub mod store;

// Re-export commonly used types
pub use config::RunConfig;
pub use error::{ApiError, PipelineError, Result};

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// seqbatch - batched sequence and metadata submission
#[derive(Parser, Debug)]
#[command(name = "seqbatch")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("metadata_file").required(true).args(["metadata", "csv", "tsv"])))]
pub struct Cli {
    /// Sequence file (FASTA)
    #[arg(short, long)]
    pub fasta: PathBuf,

    /// Metadata file, delimiter taken from --delimiter or the extension
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Comma-separated metadata file
    #[arg(short, long)]
    pub csv: Option<PathBuf>,

    /// Tab-separated metadata file
    #[arg(short, long)]
    pub tsv: Option<PathBuf>,

    /// Delimiter for --metadata: tab, comma or a single character
    #[arg(long, requires = "metadata")]
    pub delimiter: Option<String>,

    /// Metadata column holding the sequence ids
    #[arg(short, long)]
    pub key: String,

    /// Records per batch
    #[arg(short, long, default_value_t = config::DEFAULT_BATCH_SIZE)]
    pub batch: usize,

    /// Prefix of the batch files, optionally with a directory
    #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
    pub output: String,

    /// Upload target
    #[arg(short, long, default_value = config::DEFAULT_API)]
    pub api: String,

    /// API token
    #[arg(short, long, env = config::API_TOKEN_ENV, hide_env_values = true)]
    pub user: Option<String>,

    /// Use the development portal
    #[arg(short, long)]
    pub dev: bool,

    /// Explicit API base URL, overrides --dev
    #[arg(long, env = config::API_URL_ENV)]
    pub api_url: Option<String>,

    /// Submit only this batch
    #[arg(short = 'n', long)]
    pub batch_number: Option<usize>,

    /// Show at most this many error lines per batch
    #[arg(short, long)]
    pub short: Option<usize>,

    /// Delete all files named <prefix>.* before starting
    #[arg(short, long)]
    pub reset: bool,

    /// Write the batch files and stop
    #[arg(long)]
    pub batch_only: bool,

    /// HTTP request timeout in seconds
    #[arg(long, env = config::API_TIMEOUT_ENV, default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
