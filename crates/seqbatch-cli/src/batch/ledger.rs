//! Batch ledger
//!
//! A JSON snapshot of the namespace written after every phase. It is derived
//! from the batch files and never consulted to decide what to upload; its
//! one job on read is spotting re-runs whose partition options differ from
//! the run that produced the existing batches.

use crate::batch::namespace::BatchNamespace;
use crate::error::Result;
use chrono::{DateTime, Utc};
use seqbatch_common::fasta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const LEDGER_VERSION: u32 = 1;

/// Options that determined how the batches were cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSource {
    pub fasta: PathBuf,
    pub metadata: PathBuf,
    pub key_column: String,
    pub batch_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub index: usize,
    pub state: String,
    pub record_count: usize,
    pub records: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub ledger_version: u32,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub source: Option<LedgerSource>,
    #[serde(default)]
    pub batches: Vec<LedgerEntry>,
}

impl Ledger {
    /// Snapshot every complete pair in the namespace
    pub fn capture(namespace: &BatchNamespace, source: Option<LedgerSource>) -> Result<Self> {
        let scan = namespace.scan()?;

        let mut batches = Vec::with_capacity(scan.pairs.len());
        for pair in &scan.pairs {
            let mut records: Vec<String> = fasta::read_path(&pair.fasta)?
                .into_iter()
                .map(|r| r.id)
                .collect();
            records.sort();
            batches.push(LedgerEntry {
                index: pair.key.index,
                state: pair.key.state.to_string(),
                record_count: records.len(),
                records,
            });
        }

        Ok(Self {
            ledger_version: LEDGER_VERSION,
            updated: Utc::now(),
            source,
            batches,
        })
    }

    /// Read a ledger; a missing file is `None`
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), batches = self.batches.len(), "Saved ledger");
        Ok(())
    }

    /// Names of the partition options that differ from `current`
    pub fn drift(&self, current: &LedgerSource) -> Vec<&'static str> {
        let Some(recorded) = &self.source else {
            return Vec::new();
        };

        let mut changed = Vec::new();
        if recorded.fasta != current.fasta {
            changed.push("fasta");
        }
        if recorded.metadata != current.metadata {
            changed.push("metadata");
        }
        if recorded.key_column != current.key_column {
            changed.push("key_column");
        }
        if recorded.batch_size != current.batch_size {
            changed.push("batch_size");
        }
        changed
    }

    /// Total records in queued and in submitted batches
    pub fn totals(&self) -> (usize, usize) {
        self.batches.iter().fold((0, 0), |(queued, submitted), entry| {
            if entry.state == crate::batch::namespace::QUEUED {
                (queued + entry.record_count, submitted)
            } else {
                (queued, submitted + entry.record_count)
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::batch::namespace::BatchKey;
    use tempfile::TempDir;

    fn source() -> LedgerSource {
        LedgerSource {
            fasta: PathBuf::from("in.fasta"),
            metadata: PathBuf::from("meta.tsv"),
            key_column: "sample_id".into(),
            batch_size: 2,
        }
    }

    fn write_pair(ns: &BatchNamespace, key: BatchKey, ids: &[&str]) {
        let pair = ns.pair(&key);
        let fasta: String = ids.iter().map(|id| format!(">{id}\nAC\n")).collect();
        std::fs::write(&pair.fasta, fasta).unwrap();
        std::fs::write(&pair.table, "sample_id\n").unwrap();
    }

    #[test]
    fn test_capture_save_load() {
        let temp = TempDir::new().unwrap();
        let ns = BatchNamespace::new(temp.path(), "output");
        write_pair(&ns, BatchKey::submitted(0, "abc"), &["S2", "S1"]);
        write_pair(&ns, BatchKey::queued(0), &["S3"]);

        let ledger = Ledger::capture(&ns, Some(source())).unwrap();
        assert_eq!(ledger.batches.len(), 2);
        assert_eq!(ledger.batches[0].state, "queued");
        assert_eq!(ledger.batches[1].records, vec!["S1", "S2"]);
        assert_eq!(ledger.totals(), (1, 2));

        ledger.save(&ns.ledger_path()).unwrap();
        let loaded = Ledger::load(&ns.ledger_path()).unwrap().unwrap();
        assert_eq!(loaded, ledger);
    }

    #[test]
    fn test_ledger_is_not_a_batch_file() {
        let temp = TempDir::new().unwrap();
        let ns = BatchNamespace::new(temp.path(), "output");
        Ledger::capture(&ns, None).unwrap().save(&ns.ledger_path()).unwrap();
        assert!(ns.scan().unwrap().pairs.is_empty());
        assert!(ns.scan().unwrap().orphans.is_empty());
    }

    #[test]
    fn test_load_missing() {
        let temp = TempDir::new().unwrap();
        assert!(Ledger::load(&temp.path().join("none.json")).unwrap().is_none());
    }

    #[test]
    fn test_drift() {
        let temp = TempDir::new().unwrap();
        let ns = BatchNamespace::new(temp.path(), "output");
        let ledger = Ledger::capture(&ns, Some(source())).unwrap();

        assert!(ledger.drift(&source()).is_empty());

        let mut current = source();
        current.batch_size = 1000;
        current.key_column = "isolate".into();
        assert_eq!(ledger.drift(&current), vec!["key_column", "batch_size"]);

        let unknown = Ledger::capture(&ns, None).unwrap();
        assert!(unknown.drift(&current).is_empty());
    }
}
