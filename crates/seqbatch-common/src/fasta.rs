//! FASTA reading and writing
//!
//! Thin owned wrapper over `bio::io::fasta`. The identifier is the header text
//! up to the first whitespace; anything after it is kept as the description
//! and written back unchanged.

use crate::error::{FormatError, Result};
use bio::io::fasta;
use std::io::{Read, Write};
use std::path::Path;

/// A single FASTA record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Record identifier (first whitespace-delimited token of the header)
    pub id: String,

    /// Remainder of the header line, if any
    pub description: Option<String>,

    pub sequence: String,
}

impl SequenceRecord {
    /// Create a record without a description
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: None,
            sequence: sequence.into(),
        }
    }

    /// Attach a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn from_bio(record: &fasta::Record) -> Self {
        Self {
            id: record.id().to_string(),
            description: record
                .desc()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            sequence: String::from_utf8_lossy(record.seq()).into_owned(),
        }
    }
}

/// Parse FASTA from any reader, in file order
pub fn parse<R: Read>(reader: R) -> Result<Vec<SequenceRecord>> {
    let mut records = Vec::new();

    for (i, record) in fasta::Reader::new(reader).records().enumerate() {
        let record = record.map_err(|e| FormatError::fasta(i + 1, e.to_string()))?;
        record
            .check()
            .map_err(|message| FormatError::fasta(i + 1, message))?;
        records.push(SequenceRecord::from_bio(&record));
    }

    Ok(records)
}

/// Read and parse a FASTA file; invalid UTF-8 is replaced, not rejected
pub fn read_path(path: impl AsRef<Path>) -> Result<Vec<SequenceRecord>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| FormatError::io(path, e))?;
    parse(String::from_utf8_lossy(&bytes).as_bytes())
}

/// Write records to any writer
pub fn write<W: Write>(writer: W, records: &[SequenceRecord]) -> std::io::Result<()> {
    let mut writer = fasta::Writer::new(writer);
    for record in records {
        writer.write(
            &record.id,
            record.description.as_deref(),
            record.sequence.as_bytes(),
        )?;
    }
    writer.flush()
}

/// Write records to a file, replacing its contents
pub fn write_path(path: impl AsRef<Path>, records: &[SequenceRecord]) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).map_err(|e| FormatError::io(path, e))?;
    write(file, records).map_err(|e| FormatError::io(path, e))
}
