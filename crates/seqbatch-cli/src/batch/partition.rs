//! Batch partitioner
//!
//! Splits the id-sorted records into contiguous groups of at most
//! `batch_size` and gives each group the metadata rows keyed by its ids.

use crate::batch::content::BatchContent;
use crate::batch::namespace::{BatchKey, BatchNamespace, BatchPair};
use crate::error::{PipelineError, Result};
use crate::store::KeyedMetadata;
use seqbatch_common::fasta::SequenceRecord;
use std::collections::HashSet;
use tracing::info;

/// Group records into batches; the last batch may be smaller
pub fn partition(
    records: &[SequenceRecord],
    metadata: &KeyedMetadata,
    batch_size: usize,
) -> Result<Vec<BatchContent>> {
    if batch_size == 0 {
        return Err(PipelineError::config("Batch size must be at least 1"));
    }

    Ok(records
        .chunks(batch_size)
        .map(|chunk| {
            let ids: HashSet<&str> = chunk.iter().map(|r| r.id.as_str()).collect();
            BatchContent::new(
                chunk.to_vec(),
                metadata.table.select_keys(metadata.key_index, &ids),
                metadata.key_index,
            )
        })
        .collect())
}

/// Write each batch as `<stem>.<index>.queued.fasta|tsv`
pub fn write_batches(namespace: &BatchNamespace, batches: &[BatchContent]) -> Result<Vec<BatchPair>> {
    std::fs::create_dir_all(namespace.dir())?;

    let mut pairs = Vec::with_capacity(batches.len());
    for (index, batch) in batches.iter().enumerate() {
        let pair = namespace.pair(&BatchKey::queued(index));
        batch.save(&pair)?;
        info!(batch = index, records = batch.len(), "Wrote batch");
        pairs.push(pair);
    }
    Ok(pairs)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use seqbatch_common::table::MetadataTable;
    use tempfile::TempDir;

    fn dataset(n: usize) -> (Vec<SequenceRecord>, KeyedMetadata) {
        let ids: Vec<String> = (0..n).map(|i| format!("S{:05}", i)).collect();
        let records = ids.iter().map(|id| SequenceRecord::new(id.as_str(), "ACGT")).collect();
        let rows = ids.iter().map(|id| vec![id.clone()]).collect();
        let metadata = KeyedMetadata {
            table: MetadataTable::new(vec!["sample_id".into()], rows).unwrap(),
            key_column: "sample_id".into(),
            key_index: 0,
        };
        (records, metadata)
    }

    #[test]
    fn test_partition_sizes() {
        let (records, metadata) = dataset(2500);
        let sizes: Vec<_> = partition(&records, &metadata, 1000)
            .unwrap()
            .iter()
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);

        let (records, metadata) = dataset(500);
        assert_eq!(partition(&records, &metadata, 1000).unwrap().len(), 1);
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let (records, metadata) = dataset(25);
        let batches = partition(&records, &metadata, 7).unwrap();

        let mut seen = HashSet::new();
        for batch in &batches {
            assert_eq!(batch.len(), batch.table.len());
            for id in batch.ids() {
                assert!(seen.insert(id.to_string()), "{id} in two batches");
            }
            assert!(batch.table.column_values(0).eq(batch.ids()));
        }
        assert_eq!(seen.len(), 25);
    }

    #[test]
    fn test_zero_batch_size() {
        let (records, metadata) = dataset(3);
        assert!(matches!(partition(&records, &metadata, 0), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_write_batches() {
        let temp = TempDir::new().unwrap();
        let ns = BatchNamespace::new(temp.path().join("out"), "run");
        let (records, metadata) = dataset(5);
        let batches = partition(&records, &metadata, 2).unwrap();

        let pairs = write_batches(&ns, &batches).unwrap();
        assert_eq!(pairs.len(), 3);
        assert!(temp.path().join("out/run.2.queued.fasta").exists());
        assert!(temp.path().join("out/run.2.queued.tsv").exists());
        assert_eq!(ns.scan().unwrap().pairs, pairs);
    }
}
