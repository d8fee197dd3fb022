//! Replication primitives for mirrorsync
//!
//! This crate provides the target-side building blocks:
//! - Change / ChangeSet (with a JSON transport form)
//! - Diff applier with atomic per-file writes
//! - Full-tree snapshots and snapshot diffs
//! - tar.gz archives for the full-replace strategy

pub mod apply;
pub mod archive;
pub mod change;
pub mod error;
pub mod fs;
pub mod snapshot;

// Re-export main types for convenience
pub use apply::{apply, ApplyStats};
pub use change::{Change, ChangeSet};
pub use error::{ApplyError, PathError};
pub use snapshot::{snapshot, Snapshot, SnapshotDiff};
