//! Full-tree snapshots for seeding a target and comparing trees

use crate::change::{Change, ChangeSet};
use crate::fs::relative_path;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Every file under a root paired with its content, sorted by relative path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: Vec<(String, Vec<u8>)>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(p, c)| (p.as_str(), c.as_slice()))
    }

    /// Total content size in bytes
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c.len() as u64).sum()
    }

    /// Turn every entry into an upsert (used for first-time seeding)
    pub fn into_change_set(self) -> ChangeSet {
        self.entries
            .into_iter()
            .map(|(path, content)| Change::upsert(path, content))
            .collect::<Vec<_>>()
            .into()
    }
}

/// Snapshot every regular file under `root`
pub fn snapshot(root: &Path) -> Result<Snapshot> {
    snapshot_filtered(root, |_, _| false)
}

/// Snapshot `root`, skipping entries for which `skip(rel_path, is_dir)` is true
///
/// A skipped directory prunes its whole subtree.
pub fn snapshot_filtered<F>(root: &Path, skip: F) -> Result<Snapshot>
where
    F: Fn(&str, bool) -> bool,
{
    let mut entries = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            match relative_path(root, e.path()) {
                Ok(rel) => !skip(&rel, e.file_type().is_dir()),
                Err(_) => false,
            }
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if vanished_walk_entry(&e) => {
                debug!("Skipping entry removed during snapshot: {}", e);
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to walk {}", root.display()));
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let rel = relative_path(root, entry.path())
            .with_context(|| format!("Unrepresentable path {}", entry.path().display()))?;
        let content = match std::fs::read(entry.path()) {
            Ok(content) => content,
            // Removed between the walk and the read
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping {} (removed during snapshot)", rel);
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", entry.path().display()));
            }
        };
        entries.push((rel, content));
    }

    // sort_by_file_name orders siblings, not full paths ("a/b" vs "a.txt")
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(Snapshot { entries })
}

/// Walk errors for entries that disappeared after being listed
pub(crate) fn vanished_walk_entry(err: &walkdir::Error) -> bool {
    err.io_error().map(|e| e.kind()) == Some(io::ErrorKind::NotFound)
}

/// Differences between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Paths only present in the left (source) snapshot
    pub left_only: Vec<String>,
    /// Paths only present in the right (target) snapshot
    pub right_only: Vec<String>,
    /// Paths present in both with different content
    pub differing: Vec<String>,
}

impl SnapshotDiff {
    /// Compute the diff between two snapshots
    pub fn between(left: &Snapshot, right: &Snapshot) -> Self {
        let right_map: BTreeMap<&str, &[u8]> = right.iter().collect();
        let mut diff = SnapshotDiff::default();

        for (path, content) in left.iter() {
            match right_map.get(path) {
                None => diff.left_only.push(path.to_string()),
                Some(other) if *other != content => diff.differing.push(path.to_string()),
                Some(_) => {}
            }
        }

        let left_map: BTreeMap<&str, &[u8]> = left.iter().collect();
        diff.right_only = right
            .iter()
            .filter(|(path, _)| !left_map.contains_key(path))
            .map(|(path, _)| path.to_string())
            .collect();

        diff
    }

    /// Check if the trees are in sync
    pub fn is_empty(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty() && self.differing.is_empty()
    }
}
