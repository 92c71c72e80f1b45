//! `--reset`: discard every batch file of a prefix

use crate::batch::BatchNamespace;
use crate::error::Result;
use colored::Colorize;
use tracing::info;

/// Delete all `<stem>.*` files so the next partition starts from scratch
pub fn run(namespace: &BatchNamespace) -> Result<usize> {
    let removed = namespace.reset()?;

    info!(
        dir = %namespace.dir().display(),
        stem = namespace.stem(),
        removed,
        "Reset batch files"
    );
    println!(
        "{} Removed {} file(s) matching {}.*",
        "✓".green(),
        removed,
        namespace.stem()
    );
    Ok(removed)
}
