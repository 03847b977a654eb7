//! Persistent state: the wide CSV ledger and the per-question artifact directory.

pub mod artifacts;
pub mod document;
pub mod ledger;

pub use artifacts::{ArtifactDir, Sidecar};
pub use ledger::{Ledger, Record, BASE_COLUMNS, ID_COLUMN};
