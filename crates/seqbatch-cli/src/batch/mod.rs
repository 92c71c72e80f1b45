//! Batch files: naming, contents, partitioning and the derived ledger

pub mod content;
pub mod ledger;
pub mod namespace;
pub mod partition;

pub use content::BatchContent;
pub use ledger::{Ledger, LedgerSource};
pub use namespace::{BatchKey, BatchNamespace, BatchPair, BatchState, NamespaceScan};
pub use partition::{partition, write_batches};
