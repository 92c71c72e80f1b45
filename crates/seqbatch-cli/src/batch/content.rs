//! In-memory contents of one batch pair

use crate::batch::namespace::BatchPair;
use crate::error::{PipelineError, Result};
use seqbatch_common::fasta::{self, SequenceRecord};
use seqbatch_common::table::{Delimiter, MetadataTable};
use std::collections::HashSet;

/// Batch tables are always tab-delimited, whatever the input used
pub const BATCH_DELIMITER: Delimiter = Delimiter::Tab;

/// Sequence records and metadata rows of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchContent {
    pub records: Vec<SequenceRecord>,
    pub table: MetadataTable,
    pub key_index: usize,
}

impl BatchContent {
    pub fn new(records: Vec<SequenceRecord>, table: MetadataTable, key_index: usize) -> Self {
        Self {
            records,
            table,
            key_index,
        }
    }

    /// Read both files of a pair
    pub fn load(pair: &BatchPair, key_column: &str) -> Result<Self> {
        let records = fasta::read_path(&pair.fasta)?;
        let table = MetadataTable::read_path(&pair.table, BATCH_DELIMITER)?;
        let key_index = table.column_index(key_column).map_err(|_| {
            PipelineError::input(format!(
                "Batch table '{}' has no '{}' column",
                pair.table.display(),
                key_column
            ))
        })?;

        Ok(Self::new(records, table, key_index))
    }

    /// Overwrite both files of a pair
    pub fn save(&self, pair: &BatchPair) -> Result<()> {
        fasta::write_path(&pair.fasta, &self.records)?;
        self.table.write_path(&pair.table, BATCH_DELIMITER)?;
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split into (records with an id in `ids`, everything else)
    pub fn split_off(&self, ids: &HashSet<&str>) -> (Self, Self) {
        let (matched, rest): (Vec<_>, Vec<_>) = self
            .records
            .iter()
            .cloned()
            .partition(|r| ids.contains(r.id.as_str()));
        let (matched_rows, rest_rows) = self.table.partition_keys(self.key_index, ids);

        (
            Self::new(matched, matched_rows, self.key_index),
            Self::new(rest, rest_rows, self.key_index),
        )
    }

    /// Add records and rows not already present, matching by id
    ///
    /// Returns the number of records added.
    pub fn merge(&mut self, other: BatchContent) -> Result<usize> {
        if self.table.headers() != other.table.headers() {
            return Err(PipelineError::input(format!(
                "Cannot move rows with columns [{}] into a batch table with columns [{}]",
                other.table.headers().join(", "),
                self.table.headers().join(", ")
            )));
        }

        let present_records: HashSet<String> = self.ids().map(str::to_string).collect();
        let present_rows: HashSet<String> = self
            .table
            .column_values(self.key_index)
            .map(str::to_string)
            .collect();

        let known: HashSet<&str> = present_rows.iter().map(String::as_str).collect();
        let (_, new_rows) = other.table.partition_keys(other.key_index, &known);
        self.table.append(new_rows)?;

        let before = self.records.len();
        self.records.extend(
            other
                .records
                .into_iter()
                .filter(|r| !present_records.contains(&r.id)),
        );
        Ok(self.records.len() - before)
    }
}
