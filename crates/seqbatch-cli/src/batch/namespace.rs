//! Batch file namespace
//!
//! Batch state lives in file names: `<stem>.<index>.<state>.<ext>`, where
//! `state` is `queued` or the submission id the portal returned and `ext` is
//! `fasta` or `tsv`. Both files of a pair always carry the same index and
//! state. The directory listing is the source of truth; nothing else records
//! which batches exist.

use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// State token of a batch that has not been accepted yet
pub const QUEUED: &str = "queued";

/// Suffix of the derived ledger file
pub const LEDGER_SUFFIX: &str = "ledger.json";

/// Lifecycle state encoded in a batch file name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatchState {
    Queued,
    Submitted(String),
}

impl BatchState {
    /// Parse a state token; dots and empty tokens are rejected
    pub fn parse(token: &str) -> Option<Self> {
        if token.is_empty() || token.contains('.') {
            return None;
        }
        if token == QUEUED {
            Some(BatchState::Queued)
        } else {
            Some(BatchState::Submitted(token.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BatchState::Queued => QUEUED,
            BatchState::Submitted(id) => id,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, BatchState::Queued)
    }

    /// Submission id, if the batch has been accepted
    pub fn submission_id(&self) -> Option<&str> {
        match self {
            BatchState::Queued => None,
            BatchState::Submitted(id) => Some(id),
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index plus state; ordered by index first
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchKey {
    pub index: usize,
    pub state: BatchState,
}

impl BatchKey {
    pub fn queued(index: usize) -> Self {
        Self {
            index,
            state: BatchState::Queued,
        }
    }

    pub fn submitted(index: usize, submission_id: impl Into<String>) -> Self {
        Self {
            index,
            state: BatchState::Submitted(submission_id.into()),
        }
    }
}

impl fmt::Display for BatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.state)
    }
}

/// Which member of a pair a file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Sequences,
    Metadata,
}

impl FileKind {
    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Sequences => "fasta",
            FileKind::Metadata => "tsv",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "fasta" => Some(FileKind::Sequences),
            "tsv" => Some(FileKind::Metadata),
            _ => None,
        }
    }
}

/// Parsed batch file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFileName {
    pub key: BatchKey,
    pub kind: FileKind,
}

impl BatchFileName {
    /// Parse `<stem>.<index>.<state>.<ext>`; anything else is not a batch file
    pub fn parse(stem: &str, file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(stem)?.strip_prefix('.')?;

        let mut parts = rest.split('.');
        let (index, state, ext) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            key: BatchKey {
                index: parse_index(index)?,
                state: BatchState::parse(state)?,
            },
            kind: FileKind::from_extension(ext)?,
        })
    }

    pub fn to_file_name(&self, stem: &str) -> String {
        format!("{}.{}.{}", stem, self.key, self.kind.extension())
    }
}

/// Canonical decimal only, so `01` and `+1` never alias batch 1
fn parse_index(s: &str) -> Option<usize> {
    let canonical = !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s == "0" || !s.starts_with('0'));
    if canonical {
        s.parse().ok()
    } else {
        None
    }
}

/// The two files of one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPair {
    pub key: BatchKey,
    pub fasta: PathBuf,
    pub table: PathBuf,
}

/// Result of listing the namespace directory
#[derive(Debug, Default)]
pub struct NamespaceScan {
    /// Complete pairs, ascending by index then state
    pub pairs: Vec<BatchPair>,

    /// Batch files whose companion is missing
    pub orphans: Vec<PathBuf>,
}

impl NamespaceScan {
    pub fn queued(&self) -> impl Iterator<Item = &BatchPair> {
        self.pairs.iter().filter(|p| p.key.state.is_queued())
    }

    pub fn submitted(&self) -> impl Iterator<Item = &BatchPair> {
        self.pairs.iter().filter(|p| !p.key.state.is_queued())
    }
}

/// Directory plus file name stem that scope one run's batch files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchNamespace {
    dir: PathBuf,
    stem: String,
}

impl BatchNamespace {
    pub fn new(dir: impl Into<PathBuf>, stem: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            stem: stem.into(),
        }
    }

    /// Split an output prefix such as `out/run1` into directory and stem
    pub fn from_prefix(prefix: &str) -> Result<Self> {
        if prefix.is_empty() || prefix.ends_with('/') || prefix.ends_with(std::path::MAIN_SEPARATOR)
        {
            return Err(PipelineError::config(format!(
                "Output prefix '{}' must end with a file name stem, e.g. 'out/batch'",
                prefix
            )));
        }

        let path = Path::new(prefix);
        let stem = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty() && s != "." && s != "..")
            .ok_or_else(|| {
                PipelineError::config(format!("Output prefix '{}' has no file name stem", prefix))
            })?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self::new(dir, stem))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn file_path(&self, key: &BatchKey, kind: FileKind) -> PathBuf {
        let name = BatchFileName {
            key: key.clone(),
            kind,
        };
        self.dir.join(name.to_file_name(&self.stem))
    }

    pub fn pair(&self, key: &BatchKey) -> BatchPair {
        BatchPair {
            key: key.clone(),
            fasta: self.file_path(key, FileKind::Sequences),
            table: self.file_path(key, FileKind::Metadata),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, LEDGER_SUFFIX))
    }

    /// List every batch file; a missing directory is an empty namespace
    pub fn scan(&self) -> Result<NamespaceScan> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(NamespaceScan::default())
            },
            Err(e) => return Err(e.into()),
        };

        let mut found: BTreeMap<BatchKey, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(parsed) = BatchFileName::parse(&self.stem, file_name) else {
                continue;
            };

            let slot = found.entry(parsed.key).or_default();
            match parsed.kind {
                FileKind::Sequences => slot.0 = Some(entry.path()),
                FileKind::Metadata => slot.1 = Some(entry.path()),
            }
        }

        let mut scan = NamespaceScan::default();
        for (key, files) in found {
            match files {
                (Some(fasta), Some(table)) => scan.pairs.push(BatchPair { key, fasta, table }),
                (Some(path), None) | (None, Some(path)) => scan.orphans.push(path),
                (None, None) => {},
            }
        }

        debug!(
            dir = %self.dir.display(),
            pairs = scan.pairs.len(),
            orphans = scan.orphans.len(),
            "Scanned batch namespace"
        );
        Ok(scan)
    }

    /// Scan, failing when any pair has lost a member
    pub fn consistent_scan(&self) -> Result<NamespaceScan> {
        let scan = self.scan()?;
        if !scan.orphans.is_empty() {
            return Err(PipelineError::InconsistentPair(scan.orphans));
        }
        Ok(scan)
    }

    /// Whether any batch file with this index exists, in any state
    pub fn has_index(&self, index: usize) -> Result<bool> {
        let scan = self.scan()?;
        Ok(scan.pairs.iter().any(|p| p.key.index == index)
            || scan.orphans.iter().any(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| BatchFileName::parse(&self.stem, n))
                    .is_some_and(|parsed| parsed.key.index == index)
            }))
    }

    /// Delete every file named `<stem>.*` in the namespace directory
    pub fn reset(&self) -> Result<usize> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let pattern = format!("{}.", self.stem);
        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&pattern));
            if matches && entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
                debug!(path = %entry.path().display(), "Removed");
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Move both files of a pair to a new state token
    ///
    /// The sequence file moves first. If the table cannot follow, the
    /// sequence file is moved back; if that also fails the pair is left split
    /// and reported as inconsistent.
    pub fn rename_pair(&self, pair: &BatchPair, state: BatchState) -> Result<BatchPair> {
        let target = self.pair(&BatchKey {
            index: pair.key.index,
            state,
        });

        for path in [&target.fasta, &target.table] {
            if path.exists() {
                return Err(PipelineError::RenameClash(path.clone()));
            }
        }

        fs::rename(&pair.fasta, &target.fasta)?;

        if let Err(e) = fs::rename(&pair.table, &target.table) {
            warn!(
                batch = pair.key.index,
                error = %e,
                "Metadata rename failed, restoring sequence file name"
            );
            if fs::rename(&target.fasta, &pair.fasta).is_err() {
                return Err(PipelineError::InconsistentPair(vec![
                    target.fasta,
                    pair.table.clone(),
                ]));
            }
            return Err(e.into());
        }

        Ok(target)
    }
}
