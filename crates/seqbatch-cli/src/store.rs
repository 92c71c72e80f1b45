//! Record store: the full input dataset
//!
//! Loads the sequence file and the metadata table, sorts both by identifier
//! and checks that every sequence has metadata before anything is written.

use crate::error::{PipelineError, Result};
use seqbatch_common::fasta::{self, SequenceRecord};
use seqbatch_common::table::{Delimiter, MetadataTable};
use seqbatch_common::FormatError;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Metadata table with its resolved join column
#[derive(Debug, Clone)]
pub struct KeyedMetadata {
    pub table: MetadataTable,
    pub key_column: String,
    pub key_index: usize,
}

impl KeyedMetadata {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.table.column_values(self.key_index)
    }
}

/// Parse the sequence file and sort it by id
pub fn load_records(path: &Path) -> Result<Vec<SequenceRecord>> {
    let mut records = fasta::read_path(path)?;

    if records.is_empty() {
        return Err(PipelineError::input(format!(
            "No sequence records found in '{}'",
            path.display()
        )));
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));

    if let Some(pair) = records.windows(2).find(|w| w[0].id == w[1].id) {
        return Err(PipelineError::input(format!(
            "Sequence id '{}' appears more than once in '{}'",
            pair[0].id,
            path.display()
        )));
    }

    info!(records = records.len(), path = %path.display(), "Loaded sequences");
    Ok(records)
}

/// Parse the metadata file and sort it by the key column
pub fn load_metadata(path: &Path, delimiter: Delimiter, key_column: &str) -> Result<KeyedMetadata> {
    let mut table = MetadataTable::read_path(path, delimiter)?;

    let key_index = table.column_index(key_column).map_err(|e| match e {
        FormatError::MissingColumn { column, available } => PipelineError::config(format!(
            "Unable to find the key column '{}' in the metadata file '{}'. Available columns: {}",
            column,
            path.display(),
            available.join(", ")
        )),
        other => other.into(),
    })?;

    table.sort_by_column(key_index);

    info!(rows = table.len(), path = %path.display(), key = key_column, "Loaded metadata");
    Ok(KeyedMetadata {
        table,
        key_column: key_column.to_string(),
        key_index,
    })
}

/// Require a metadata row for every sequence
///
/// Returns the number of metadata rows that match no sequence; those rows are
/// left out of every batch.
pub fn check_join(
    records: &[SequenceRecord],
    metadata: &KeyedMetadata,
    short: Option<usize>,
) -> Result<usize> {
    let keys: HashSet<&str> = metadata.keys().collect();
    let missing: Vec<&str> = records
        .iter()
        .map(|r| r.id.as_str())
        .filter(|id| !keys.contains(id))
        .collect();

    if !missing.is_empty() {
        let shown = short.unwrap_or(missing.len()).min(missing.len());
        let mut message = format!(
            "{} sequence(s) have no row in the metadata key column '{}': {}",
            missing.len(),
            metadata.key_column,
            missing[..shown].join(", ")
        );
        if shown < missing.len() {
            message.push_str(&format!(" ({} more not shown)", missing.len() - shown));
        }
        return Err(PipelineError::input(message));
    }

    let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    let unmatched = metadata.keys().filter(|k| !ids.contains(k)).count();
    if unmatched > 0 {
        warn!(
            rows = unmatched,
            "Metadata rows without a matching sequence will not be submitted"
        );
    }
    Ok(unmatched)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn metadata(keys: &[&str]) -> KeyedMetadata {
        let rows = keys.iter().map(|k| vec![k.to_string()]).collect();
        KeyedMetadata {
            table: MetadataTable::new(vec!["sample_id".into()], rows).unwrap(),
            key_column: "sample_id".into(),
            key_index: 0,
        }
    }

    fn records(ids: &[&str]) -> Vec<SequenceRecord> {
        ids.iter().map(|id| SequenceRecord::new(*id, "ACGT")).collect()
    }

    #[test]
    fn test_load_records_sorts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("in.fasta");
        fs::write(&path, ">S3\nAC\n>S1 first\nGT\n>S2\nAA\n").unwrap();

        let records = load_records(&path).unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2", "S3"]);
        assert_eq!(records[0].description.as_deref(), Some("first"));
    }

    #[test]
    fn test_load_records_rejects_duplicates_and_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("dup.fasta");
        fs::write(&path, ">S1\nAC\n>S1\nGT\n").unwrap();
        let err = load_records(&path).unwrap_err();
        assert!(err.to_string().contains("'S1' appears more than once"));

        let path = temp.path().join("empty.fasta");
        fs::write(&path, "").unwrap();
        assert!(matches!(load_records(&path), Err(PipelineError::Input(_))));
    }

    #[test]
    fn test_load_records_missing_file() {
        let err = load_records(Path::new("/nonexistent/in.fasta")).unwrap_err();
        assert!(matches!(err, PipelineError::Format(ref e) if e.is_not_found()));
    }

    #[test]
    fn test_load_metadata_sorts_by_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("meta.csv");
        fs::write(&path, "province,sample_id\nON,S2\nQC,S1\n").unwrap();

        let metadata = load_metadata(&path, Delimiter::Comma, "sample_id").unwrap();
        assert_eq!(metadata.key_index, 1);
        assert_eq!(metadata.keys().collect::<Vec<_>>(), vec!["S1", "S2"]);
    }

    #[test]
    fn test_load_metadata_missing_key_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("meta.tsv");
        fs::write(&path, "province\tsample\nON\tS1\n").unwrap();

        let err = load_metadata(&path, Delimiter::Tab, "sample_id").unwrap_err();
        match err {
            PipelineError::Config(msg) => {
                assert!(msg.contains("'sample_id'"));
                assert!(msg.contains("Available columns: province, sample"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_check_join() {
        assert_eq!(check_join(&records(&["S1"]), &metadata(&["S1", "S9"]), None).unwrap(), 1);

        let err = check_join(&records(&["S1", "S2", "S3"]), &metadata(&["S1"]), Some(1)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("2 sequence(s)"));
        assert!(msg.contains("S2"));
        assert!(msg.contains("(1 more not shown)"));
    }
}
