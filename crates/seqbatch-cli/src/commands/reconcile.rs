//! Status reconciler
//!
//! Polls every submitted pair. Records the portal failed to process are moved
//! out of the submitted pair into the queued pair with the same index, where
//! they can be corrected and submitted again. Records still queued or already
//! complete stay where they are.

use crate::api::{ApiClient, ErrorTrail, UploadRecord, UploadsResponse};
use crate::batch::{BatchContent, BatchKey, BatchNamespace, BatchPair};
use crate::error::{ApiError, PipelineError, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Processing state of one uploaded record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordStatus {
    Queued,
    Error(ErrorTrail),
    /// Any other status string; treated as done
    Complete(String),
}

pub fn classify_status(record: &UploadRecord) -> RecordStatus {
    match record.status.as_str() {
        "QUEUED" => RecordStatus::Queued,
        "ERROR" => RecordStatus::Error(ErrorTrail::parse(record.error.as_deref().unwrap_or(""))),
        other => RecordStatus::Complete(other.to_string()),
    }
}

/// Reconciler options
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub key_column: String,

    /// Upper bound on records per batch, used as the status page size
    pub batch_size: usize,

    /// Cap on reported error records per batch
    pub short: Option<usize>,
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    pub checked: usize,
    pub pending: usize,
    pub complete: usize,
    pub errors: usize,

    /// Records moved back into queued pairs
    pub requeued: usize,

    /// Batches whose status could not be fetched
    pub unavailable: Vec<usize>,
}

/// Poll each submitted pair and requeue failed records
pub async fn reconcile_submitted(
    client: &ApiClient,
    namespace: &BatchNamespace,
    options: &ReconcileOptions,
) -> Result<ReconcileSummary> {
    let scan = namespace.consistent_scan()?;
    let mut summary = ReconcileSummary::default();

    for pair in scan.submitted() {
        let Some(submission_id) = pair.key.state.submission_id() else {
            continue;
        };
        let batch = pair.key.index;

        let response = client
            .upload_status(submission_id, options.batch_size + 1)
            .await?;

        if response.status == 401 {
            return Err(ApiError::Unauthorized.into());
        }
        if response.status != 200 {
            warn!(batch, submission_id, status = response.status, "Status unavailable");
            summary.unavailable.push(batch);
            continue;
        }
        let uploads: UploadsResponse = match serde_json::from_str(&response.body) {
            Ok(uploads) => uploads,
            Err(e) => {
                warn!(batch, submission_id, error = %e, "Status unavailable, unreadable response");
                summary.unavailable.push(batch);
                continue;
            },
        };

        summary.checked += 1;
        let mut failed: Vec<(String, ErrorTrail)> = Vec::new();
        for record in &uploads.data {
            match classify_status(record) {
                RecordStatus::Queued => summary.pending += 1,
                RecordStatus::Complete(status) => {
                    debug!(batch, sample = %record.submitter_sample_id, status = %status, "Record done");
                    summary.complete += 1;
                },
                RecordStatus::Error(trail) => {
                    failed.push((record.submitter_sample_id.clone(), trail));
                },
            }
        }
        summary.errors += failed.len();

        if failed.is_empty() {
            info!(batch, submission_id, records = uploads.data.len(), "No failed records");
            continue;
        }

        report_failures(batch, &failed, options.short);

        let ids: HashSet<&str> = failed.iter().map(|(id, _)| id.as_str()).collect();
        summary.requeued += requeue(namespace, pair, &ids, &options.key_column)?;
    }

    Ok(summary)
}

/// Move records with an id in `ids` from `pair` into its queued companion
///
/// Only ids still present in the pair are moved, so repeating an interrupted
/// reconciliation neither duplicates nor loses records. The queued pair is
/// written before the submitted pair shrinks.
pub fn requeue(
    namespace: &BatchNamespace,
    pair: &BatchPair,
    ids: &HashSet<&str>,
    key_column: &str,
) -> Result<usize> {
    let current = BatchContent::load(pair, key_column)?;
    let present: HashSet<&str> = current.ids().filter(|id| ids.contains(id)).collect();
    if present.is_empty() {
        debug!(batch = pair.key.index, "Failed records already requeued");
        return Ok(0);
    }

    let (moved, remaining) = current.split_off(&present);
    let moved_count = moved.len();

    let queued_pair = namespace.pair(&BatchKey::queued(pair.key.index));
    let queued = match (queued_pair.fasta.exists(), queued_pair.table.exists()) {
        (true, true) => {
            let mut queued = BatchContent::load(&queued_pair, key_column)?;
            queued.merge(moved)?;
            queued
        },
        (false, false) => moved,
        (true, false) => return Err(PipelineError::InconsistentPair(vec![queued_pair.fasta])),
        (false, true) => return Err(PipelineError::InconsistentPair(vec![queued_pair.table])),
    };

    queued.save(&queued_pair)?;
    remaining.save(pair)?;

    info!(
        batch = pair.key.index,
        state = %pair.key.state,
        records = moved_count,
        remaining = remaining.len(),
        "Requeued failed records"
    );
    Ok(moved_count)
}

fn report_failures(batch: usize, failed: &[(String, ErrorTrail)], short: Option<usize>) {
    warn!(batch, records = failed.len(), "Records failed processing");

    let shown = short.unwrap_or(failed.len()).min(failed.len());
    for (id, trail) in &failed[..shown] {
        warn!(batch, sample = %id, "Record failed");
        for field in &trail.fields {
            warn!(batch, sample = %id, "  {}", field);
        }
    }
    if shown < failed.len() {
        warn!(batch, "{} more not shown", failed.len() - shown);
    }
}
