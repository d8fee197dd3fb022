//! Diff applier: replays a change set onto a target tree

use crate::change::{Change, ChangeSet};
use crate::error::ApplyError;
use crate::fs::{atomic_write, remove_path, resolve};
use std::path::Path;
use tracing::debug;

/// Counters describing what an apply call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Files created or overwritten
    pub written: usize,
    /// Files or subtrees removed
    pub deleted: usize,
    /// Deletes of paths that were already absent
    pub skipped: usize,
}

impl ApplyStats {
    /// Total number of changes processed
    pub fn total(&self) -> usize {
        self.written + self.deleted + self.skipped
    }
}

/// Apply `changes` to `target_root` in order
///
/// Stops at the first failure. Changes applied before the failure stay
/// applied; each individual write or delete is atomic on its own.
pub fn apply(target_root: &Path, changes: &ChangeSet) -> Result<ApplyStats, ApplyError> {
    let mut stats = ApplyStats::default();

    for change in changes {
        apply_one(target_root, change, &mut stats)?;
    }

    debug!(
        "Applied {} changes to {} ({} written, {} deleted, {} already absent)",
        stats.total(),
        target_root.display(),
        stats.written,
        stats.deleted,
        stats.skipped
    );
    Ok(stats)
}

fn apply_one(target_root: &Path, change: &Change, stats: &mut ApplyStats) -> Result<(), ApplyError> {
    let target = resolve(target_root, &change.path).map_err(|reason| ApplyError::InvalidPath {
        path: change.path.clone(),
        reason,
    })?;

    match &change.content {
        None => {
            let removed =
                remove_path(&target).map_err(|e| ApplyError::io(&change.path, "delete", e))?;
            if removed {
                stats.deleted += 1;
            } else {
                stats.skipped += 1;
            }
        }
        Some(content) => {
            // A directory replaced by a file in the source arrives as a bare upsert
            let is_dir = std::fs::symlink_metadata(&target)
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir {
                debug!("Replacing directory {} with a file", change.path);
                remove_path(&target).map_err(|e| ApplyError::io(&change.path, "delete", e))?;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ApplyError::io(&change.path, "create parent of", e))?;
            }
            atomic_write(&target, content).map_err(|e| ApplyError::io(&change.path, "write", e))?;
            stats.written += 1;
        }
    }

    Ok(())
}
