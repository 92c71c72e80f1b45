//! Error types for seqbatch file formats

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for format operations
pub type Result<T> = std::result::Result<T, FormatError>;

/// Errors raised while reading or writing FASTA and tabular files
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `record` is 1-based
    #[error("Invalid FASTA record {record}: {message}")]
    Fasta { record: usize, message: String },

    #[error("Invalid table: {0}")]
    Table(String),

    #[error("Column '{column}' not found. Available columns: {}", .available.join(", "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl FormatError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a FASTA syntax error
    pub fn fasta(record: usize, message: impl Into<String>) -> Self {
        Self::Fasta {
            record,
            message: message.into(),
        }
    }

    /// Create a table shape error
    pub fn table(message: impl Into<String>) -> Self {
        Self::Table(message.into())
    }

    /// True when the underlying cause is a missing file
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
