//! seqbatch Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared file formats, error handling and logging for the seqbatch workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`FormatError`] and the [`Result`] alias
//! - **FASTA**: Sequence record reading and writing ([`fasta`])
//! - **Tables**: Delimited metadata reading and writing ([`table`])
//! - **Logging**: Console/file tracing setup ([`logging`])
//!
//! # Example
//!
//! ```no_run
//! use seqbatch_common::fasta;
//! use seqbatch_common::table::{Delimiter, MetadataTable};
//!
//! fn load() -> seqbatch_common::Result<()> {
//!     let records = fasta::read_path("consensus.fasta")?;
//!     let table = MetadataTable::read_path("samples.tsv", Delimiter::Tab)?;
//!     println!("{} records, {} rows", records.len(), table.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod fasta;
pub mod logging;
pub mod table;

// Re-export commonly used types
pub use error::{FormatError, Result};
pub use fasta::SequenceRecord;
pub use table::{Delimiter, MetadataTable};
