//! Run configuration
//!
//! Turns the parsed command line into a validated [`RunConfig`].

use crate::batch::BatchNamespace;
use crate::error::{PipelineError, Result};
use crate::Cli;
use seqbatch_common::table::Delimiter;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Live VirusSeq portal submission service
pub const LIVE_API_URL: &str = "https://muse.virusseq-dataportal.ca";

/// Development VirusSeq portal submission service
pub const DEV_API_URL: &str = "https://muse.dev.cancogen.cancercollaboratory.org";

pub const DEFAULT_API: &str = "VirusSeq_Portal";
pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_OUTPUT: &str = "output";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

pub const API_TOKEN_ENV: &str = "SEQBATCH_API_TOKEN";
pub const API_URL_ENV: &str = "SEQBATCH_API_URL";
pub const API_TIMEOUT_ENV: &str = "SEQBATCH_API_TIMEOUT_SECS";

/// Supported upload targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiTarget {
    VirusSeqPortal,
}

impl ApiTarget {
    pub fn base_url(self, dev: bool) -> &'static str {
        match (self, dev) {
            (ApiTarget::VirusSeqPortal, false) => LIVE_API_URL,
            (ApiTarget::VirusSeqPortal, true) => DEV_API_URL,
        }
    }
}

impl FromStr for ApiTarget {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case(DEFAULT_API) {
            Ok(ApiTarget::VirusSeqPortal)
        } else {
            Err(PipelineError::config(format!(
                "Unknown API '{}'. Supported: {}",
                s, DEFAULT_API
            )))
        }
    }
}

/// Where and how to upload
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub token: String,
    pub timeout: Duration,
}

/// Validated options for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub fasta: PathBuf,
    pub metadata: PathBuf,
    pub delimiter: Delimiter,
    pub key_column: String,
    pub batch_size: usize,
    pub namespace: BatchNamespace,

    /// `None` with `--batch-only`
    pub api: Option<ApiSettings>,

    pub batch_number: Option<usize>,
    pub short: Option<usize>,
    pub reset: bool,
    pub verbose: bool,
}

impl RunConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.batch == 0 {
            return Err(PipelineError::config("Batch size (--batch) must be at least 1"));
        }

        require_file(&cli.fasta, "FASTA")?;
        let (metadata, delimiter) = metadata_source(cli)?;
        require_file(&metadata, "Metadata")?;

        let namespace = BatchNamespace::from_prefix(&cli.output)?;
        let target: ApiTarget = cli.api.parse()?;

        let api = if cli.batch_only {
            None
        } else {
            let token = cli
                .user
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    PipelineError::config(format!(
                        "An API token is required to upload. Pass --user or set {}, or use --batch-only.",
                        API_TOKEN_ENV
                    ))
                })?;

            if cli.timeout_secs == 0 {
                return Err(PipelineError::config("--timeout-secs must be at least 1"));
            }

            let base_url = match &cli.api_url {
                Some(url) => url.trim_end_matches('/').to_string(),
                None => target.base_url(cli.dev).to_string(),
            };

            Some(ApiSettings {
                base_url,
                token: token.to_string(),
                timeout: Duration::from_secs(cli.timeout_secs),
            })
        };

        Ok(Self {
            fasta: cli.fasta.clone(),
            metadata,
            delimiter,
            key_column: cli.key.clone(),
            batch_size: cli.batch,
            namespace,
            api,
            batch_number: cli.batch_number,
            short: cli.short,
            reset: cli.reset,
            verbose: cli.verbose,
        })
    }
}

fn metadata_source(cli: &Cli) -> Result<(PathBuf, Delimiter)> {
    match (&cli.metadata, &cli.csv, &cli.tsv) {
        (_, Some(csv), _) => Ok((csv.clone(), Delimiter::Comma)),
        (_, _, Some(tsv)) => Ok((tsv.clone(), Delimiter::Tab)),
        (Some(path), None, None) => {
            let delimiter = match &cli.delimiter {
                Some(d) => d
                    .parse()
                    .map_err(|e: seqbatch_common::FormatError| PipelineError::config(e.to_string()))?,
                None => Delimiter::from_extension(path).ok_or_else(|| {
                    PipelineError::config(format!(
                        "Cannot tell the delimiter of '{}' from its extension. Pass --delimiter, --csv or --tsv.",
                        path.display()
                    ))
                })?,
            };
            Ok((path.clone(), delimiter))
        },
        (None, None, None) => Err(PipelineError::config(
            "A metadata file is required (--metadata, --csv or --tsv)",
        )),
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::config(format!(
            "{} file '{}' not found",
            what,
            path.display()
        )))
    }
}
