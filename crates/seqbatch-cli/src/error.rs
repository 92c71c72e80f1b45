//! Error types for seqbatch
//!
//! Messages are user-facing and end with what to do next. [`ApiError`]
//! classifies remote responses; [`ApiError::is_fatal`] decides whether a run
//! stops or moves on to the next batch.

use crate::api::InvalidField;
use seqbatch_common::FormatError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that end a run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Options or pre-flight checks failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input files could not be parsed or do not line up
    #[error("Input error: {0}")]
    Input(String),

    /// A batch pair lost one of its files, typically after an interrupted rename
    #[error("Inconsistent batch files: {}. Rename the files so both members of each pair carry the same state token, or rerun with --reset.", describe_paths(.0))]
    InconsistentPair(Vec<PathBuf>),

    /// A rename would overwrite an existing batch file
    #[error("Refusing to overwrite existing batch file '{}'", .0.display())]
    RenameClash(PathBuf),

    /// The portal accepted a batch but its files still carry the old state
    #[error("Batch {batch} was accepted as submission '{submission_id}' but its files could not be renamed: {source}. Rename the pair to '<prefix>.{batch}.{submission_id}.fasta/.tsv' by hand before rerunning, or the batch will be submitted twice.")]
    UnrecordedSubmission {
        batch: usize,
        submission_id: String,
        source: Box<PipelineError>,
    },

    /// Fatal API response or transport failure
    #[error(transparent)]
    Api(#[from] ApiError),

    /// FASTA or tabular file problem
    #[error("Input error: {0}")]
    Format(#[from] FormatError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }
}

fn describe_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Message the portal returns when the metadata columns are wrong
pub const MSG_HEADERS_INCORRECT: &str = "Headers are incorrect!";

/// Message the portal returns for per-record validation failures
pub const MSG_INVALID_FIELDS: &str = "Found records with invalid fields";

/// Server-side message seen when a metadata file has a header but no rows
pub const MSG_NO_DATA_ROWS: &str = "Flux#last() didn't observe any onNext signal";

/// Classified outcome of a failed API call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("API server problem at {url}: {message}. Check the API URL and your network connection.")]
    Transport { url: String, message: String },

    #[error("Unauthorized client error (401). Check to make sure your API key is current.")]
    Unauthorized,

    #[error("Access denied ({message}). The account associated with the API key has not been authorized for upload yet.")]
    Forbidden { message: String },

    #[error("API service endpoint not recognized (404). Check the API URL.")]
    EndpointNotFound,

    #[error("The API accepted the batch but reported no submissionId: {body}. Resolve the reported error, then rerun.")]
    MissingSubmissionId { body: String },

    #[error("The API returned an unusable submissionId '{id}'")]
    InvalidSubmissionId { id: String },

    #[error("Headers are incorrect! Unknown headers: [{}]. Missing headers: [{}]. Correct the metadata file headers, then rerun with --reset.", .unknown.join(", "), .missing.join(", "))]
    Schema {
        unknown: Vec<String>,
        missing: Vec<String>,
    },

    #[error("Found records with invalid fields: {} invalid field(s)", .fields.len())]
    Validation { fields: Vec<InvalidField> },

    #[error("Internal server error ({status}): {message}")]
    Server { status: String, message: String },

    #[error("Unable to complete batch because of status code {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl ApiError {
    /// Fatal errors would recur for every remaining batch, so the run stops
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ApiError::Validation { .. }
                | ApiError::Server { .. }
                | ApiError::UnexpectedResponse { .. }
        )
    }

    /// Extra operator hint for well-known upstream messages
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ApiError::Server { message, .. } if message == MSG_NO_DATA_ROWS => {
                Some("Does the .tsv file have no data rows?")
            },
            ApiError::Validation { .. } => {
                Some("Correct the listed fields in the batch files, then rerun to resubmit.")
            },
            _ => None,
        }
    }
}
