//! One pipeline invocation
//!
//! load inputs → reset (optional) → partition (skipped once batch 0 exists)
//! → submit queued pairs → reconcile submitted pairs. The ledger is
//! refreshed after each phase, including a phase that failed.

use crate::api::ApiClient;
use crate::batch::{self, BatchNamespace, Ledger, LedgerSource};
use crate::commands::reconcile::{self, ReconcileOptions, ReconcileSummary};
use crate::commands::reset;
use crate::commands::submit::{self, SubmitOptions, SubmitSummary};
use crate::config::RunConfig;
use crate::error::Result;
use crate::store;
use tracing::{info, warn};

/// What one invocation did
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Number of batches written, `None` when partitioning was skipped
    pub partitioned: Option<usize>,
    pub submit: Option<SubmitSummary>,
    pub reconcile: Option<ReconcileSummary>,

    /// Ledger after the last phase
    pub ledger: Option<Ledger>,
}

pub async fn run(config: &RunConfig) -> Result<RunOutcome> {
    let namespace = &config.namespace;

    let records = store::load_records(&config.fasta)?;
    let metadata = store::load_metadata(&config.metadata, config.delimiter, &config.key_column)?;
    store::check_join(&records, &metadata, config.short)?;

    // Only once the inputs are known to be usable
    if config.reset {
        reset::run(namespace)?;
    }

    let current = LedgerSource {
        fasta: config.fasta.clone(),
        metadata: config.metadata.clone(),
        key_column: config.key_column.clone(),
        batch_size: config.batch_size,
    };

    let mut outcome = RunOutcome::default();

    let source = if namespace.has_index(0)? {
        info!("Batch 0 already exists, skipping partitioning");
        let previous = load_ledger(namespace);
        if let Some(ledger) = &previous {
            let changed = ledger.drift(&current);
            if !changed.is_empty() {
                warn!(
                    changed = ?changed,
                    "Existing batches were cut with different options. Rerun with --reset to rebuild them."
                );
            }
        }
        previous.and_then(|l| l.source)
    } else {
        let batches = batch::partition(&records, &metadata, config.batch_size)?;
        batch::write_batches(namespace, &batches)?;
        info!(batches = batches.len(), records = records.len(), "Partitioned input");
        outcome.partitioned = Some(batches.len());
        Some(current)
    };
    outcome.ledger = refresh_ledger(namespace, source.clone());

    let Some(api) = &config.api else {
        namespace.consistent_scan()?;
        return Ok(outcome);
    };
    let client = ApiClient::new(&api.base_url, &api.token, api.timeout)?;
    info!(url = client.base_url(), "Using submission API");

    let submit_options = SubmitOptions {
        batch_number: config.batch_number,
        short: config.short,
    };
    let submitted = submit::submit_queued(&client, namespace, &submit_options).await;
    outcome.ledger = refresh_ledger(namespace, source.clone());
    outcome.submit = Some(submitted?);

    let reconcile_options = ReconcileOptions {
        key_column: config.key_column.clone(),
        batch_size: config.batch_size,
        short: config.short,
    };
    let reconciled = reconcile::reconcile_submitted(&client, namespace, &reconcile_options).await;
    outcome.ledger = refresh_ledger(namespace, source);
    outcome.reconcile = Some(reconciled?);

    Ok(outcome)
}

fn load_ledger(namespace: &BatchNamespace) -> Option<Ledger> {
    match Ledger::load(&namespace.ledger_path()) {
        Ok(ledger) => ledger,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable ledger");
            None
        },
    }
}

/// Rewrite the ledger from the namespace; failures only warn
fn refresh_ledger(namespace: &BatchNamespace, source: Option<LedgerSource>) -> Option<Ledger> {
    let ledger = match Ledger::capture(namespace, source) {
        Ok(ledger) => ledger,
        Err(e) => {
            warn!(error = %e, "Could not capture ledger");
            return None;
        },
    };

    if let Err(e) = ledger.save(&namespace.ledger_path()) {
        warn!(error = %e, "Could not write ledger");
    }
    Some(ledger)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::batch::{BatchKey, BatchState};
    use crate::config::ApiSettings;
    use crate::error::PipelineError;
    use seqbatch_common::table::Delimiter;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_inputs(dir: &Path, n: usize) {
        let fasta: String = (0..n).map(|i| format!(">S{i:02}\nACGT\n")).collect();
        let tsv: String = (0..n).map(|i| format!("S{i:02}\tON\n")).collect();
        fs::write(dir.join("in.fasta"), fasta).unwrap();
        fs::write(dir.join("meta.tsv"), format!("sample_id\tprovince\n{tsv}")).unwrap();
    }

    fn config(dir: &Path, batch_size: usize, api: Option<ApiSettings>) -> RunConfig {
        RunConfig {
            fasta: dir.join("in.fasta"),
            metadata: dir.join("meta.tsv"),
            delimiter: Delimiter::Tab,
            key_column: "sample_id".into(),
            batch_size,
            namespace: BatchNamespace::new(dir, "output"),
            api,
            batch_number: None,
            short: None,
            reset: false,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_batch_only_partitions_once() {
        let temp = TempDir::new().unwrap();
        write_inputs(temp.path(), 5);
        let config = config(temp.path(), 2, None);

        let first = run(&config).await.unwrap();
        assert_eq!(first.partitioned, Some(3));
        let ledger = first.ledger.unwrap();
        assert_eq!(ledger.batches.len(), 3);
        assert_eq!(ledger.source.unwrap().batch_size, 2);

        let before = fs::read_to_string(temp.path().join("output.0.queued.fasta")).unwrap();
        let second = run(&config).await.unwrap();
        assert_eq!(second.partitioned, None);
        assert_eq!(config.namespace.scan().unwrap().pairs.len(), 3);
        assert_eq!(
            fs::read_to_string(temp.path().join("output.0.queued.fasta")).unwrap(),
            before
        );
    }

    #[tokio::test]
    async fn test_reset_regenerates_batches() {
        let temp = TempDir::new().unwrap();
        write_inputs(temp.path(), 5);
        run(&config(temp.path(), 2, None)).await.unwrap();

        let mut rebuilt = config(temp.path(), 5, None);
        rebuilt.reset = true;
        let outcome = run(&rebuilt).await.unwrap();

        assert_eq!(outcome.partitioned, Some(1));
        assert_eq!(rebuilt.namespace.scan().unwrap().pairs.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_keeps_batches_when_key_column_missing() {
        let temp = TempDir::new().unwrap();
        write_inputs(temp.path(), 2);
        let ns = BatchNamespace::new(temp.path(), "output");
        let submitted = ns.pair(&BatchKey {
            index: 0,
            state: BatchState::Submitted("sub-kept".into()),
        });
        fs::write(&submitted.fasta, ">S00\nACGT\n").unwrap();
        fs::write(&submitted.table, "sample_id\tprovince\nS00\tON\n").unwrap();

        let mut bad = config(temp.path(), 2, None);
        bad.reset = true;
        bad.key_column = "isolate".into();
        let err = run(&bad).await.unwrap_err();

        assert!(matches!(err, PipelineError::Config(_)));
        assert!(submitted.fasta.exists() && submitted.table.exists());
    }

    #[tokio::test]
    async fn test_batch_only_detects_half_renamed_pair() {
        let temp = TempDir::new().unwrap();
        write_inputs(temp.path(), 3);
        let config = config(temp.path(), 2, None);
        run(&config).await.unwrap();

        fs::rename(
            temp.path().join("output.1.queued.tsv"),
            temp.path().join("output.1.sub-x.tsv"),
        )
        .unwrap();

        let err = run(&config).await.unwrap_err();
        assert!(matches!(err, PipelineError::InconsistentPair(ref paths) if paths.len() == 2));
    }

    #[tokio::test]
    async fn test_full_run_against_mock_portal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"submissionId":"sub-0"}"#))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"submissionId":"sub-1"}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/uploads"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r##"{"data":[{"submitterSampleId":"S01","status":"ERROR","error":"#sample/province:unknown"}]}"##,
            ))
            .mount(&server)
            .await;

        let temp = TempDir::new().unwrap();
        write_inputs(temp.path(), 3);
        let api = ApiSettings {
            base_url: server.uri(),
            token: "t".into(),
            timeout: Duration::from_secs(5),
        };
        let outcome = run(&config(temp.path(), 2, Some(api))).await.unwrap();

        assert_eq!(outcome.submit.unwrap().submitted.len(), 2);
        assert_eq!(outcome.reconcile.unwrap().requeued, 1);

        let ledger = outcome.ledger.unwrap();
        let states: Vec<_> = ledger
            .batches
            .iter()
            .map(|b| (b.index, b.state.as_str(), b.record_count))
            .collect();
        assert_eq!(states, vec![(0, "queued", 1), (0, "sub-0", 1), (1, "sub-1", 1)]);
    }
}
