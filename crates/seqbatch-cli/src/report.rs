//! End-of-run report

use crate::batch::Ledger;
use crate::commands::run::RunOutcome;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};

/// Table of every batch pair with its state and size
pub fn batch_table(ledger: &Ledger) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Batch", "State", "Records"]);

    for entry in &ledger.batches {
        table.add_row(vec![
            entry.index.to_string(),
            entry.state.clone(),
            entry.record_count.to_string(),
        ]);
    }
    table
}

/// Print the outcome of a run to stdout
pub fn print(outcome: &RunOutcome) {
    if let Some(count) = outcome.partitioned {
        println!("{} Wrote {} batch(es)", "✓".green(), count);
    }

    if let Some(submit) = &outcome.submit {
        println!(
            "{} Submitted {} batch(es), {} rejected",
            "→".cyan(),
            submit.submitted.len(),
            submit.rejected.len()
        );
    }

    if let Some(reconcile) = &outcome.reconcile {
        println!(
            "{} Checked {} submission(s): {} complete, {} pending, {} failed, {} requeued",
            "→".cyan(),
            reconcile.checked,
            reconcile.complete,
            reconcile.pending,
            reconcile.errors,
            reconcile.requeued
        );
        if !reconcile.unavailable.is_empty() {
            println!(
                "{} Status unavailable for batch(es) {:?}",
                "!".yellow(),
                reconcile.unavailable
            );
        }
    }

    let Some(ledger) = &outcome.ledger else {
        return;
    };

    if ledger.batches.is_empty() {
        println!("No batch files found.");
        return;
    }

    println!();
    println!("{}", batch_table(ledger));

    let (queued, submitted) = ledger.totals();
    println!();
    println!("{}", "Summary:".cyan().bold());
    println!("  Queued records:    {}", queued);
    println!("  Submitted records: {}", submitted);

    if queued > 0 {
        println!(
            "{} Queued batches remain; correct any reported errors and rerun to submit them.",
            "!".yellow()
        );
    } else {
        println!("{} All records submitted", "✓".green());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::batch::ledger::{LedgerEntry, LEDGER_VERSION};
    use chrono::Utc;

    #[test]
    fn test_batch_table_rows() {
        let ledger = Ledger {
            ledger_version: LEDGER_VERSION,
            updated: Utc::now(),
            source: None,
            batches: vec![
                LedgerEntry {
                    index: 0,
                    state: "queued".into(),
                    record_count: 1,
                    records: vec!["S3".into()],
                },
                LedgerEntry {
                    index: 0,
                    state: "f3a1-77".into(),
                    record_count: 2,
                    records: vec!["S1".into(), "S2".into()],
                },
            ],
        };

        let rendered = batch_table(&ledger).to_string();
        assert!(rendered.contains("Batch"));
        assert!(rendered.contains("f3a1-77"));
        assert_eq!(ledger.totals(), (1, 2));
    }
}
