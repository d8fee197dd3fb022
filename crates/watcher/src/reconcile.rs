//! Batch reconciliation: raw events in, minimal change set out
//!
//! Folds one batch of create/modify/delete notifications into at most one
//! operation per relative path:
//! - a create followed by a delete in the same batch cancels out
//! - a directory delete supersedes every pending change beneath it
//! - files that vanished before they could be read are dropped silently

use crate::{EventKind, RawEvent};
use ahash::AHashMap;
use mirror_core::fs::{is_nested_under, relative_path, resolve};
use mirror_core::{Change, ChangeSet};
use std::io;
use std::path::Path;
use tracing::debug;

/// Net state of a path within one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedStatus {
    /// Create or overwrite with current source content
    Upsert,
    /// Remove from the target (file or subtree)
    Delete,
}

/// What an incoming event does to a path's tracked status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    /// Record this status (keeps position if already tracked)
    Set(TrackedStatus),
    /// Leave the existing entry untouched
    Keep,
    /// Forget the path: its pending changes net to nothing
    Remove,
    /// Drop all descendants, then record the directory as deleted
    CascadeDelete,
    /// Event carries no replicable information
    Ignore,
}

impl Transition {
    /// The full transition table over (existing status, incoming event)
    fn of(existing: Option<TrackedStatus>, kind: EventKind, is_directory: bool) -> Self {
        use EventKind::*;
        use TrackedStatus::*;

        match (is_directory, kind, existing) {
            // Directory existence is implied by the files beneath it
            (true, Created | Modified, _) => Transition::Ignore,
            (true, Deleted, _) => Transition::CascadeDelete,

            (false, Created, _) => Transition::Set(Upsert),

            (false, Modified, None) => Transition::Set(Upsert),
            // Never downgrades an Upsert nor resurrects a Delete
            (false, Modified, Some(_)) => Transition::Keep,

            (false, Deleted, Some(Upsert)) => Transition::Remove,
            (false, Deleted, None) => Transition::Set(Delete),
            (false, Deleted, Some(Delete)) => Transition::Keep,
        }
    }
}

/// Result of reading a source file during materialization
#[derive(Debug)]
pub enum ReadOutcome {
    /// The file was read completely
    Content(Vec<u8>),
    /// The file is gone or unreadable; the path is omitted from the change set
    Missing(io::ErrorKind),
}

impl ReadOutcome {
    /// Read `path`, classifying every failure as a recoverable miss
    ///
    /// Only regular files count; symlinks and directories are misses, the
    /// same set of entries a snapshot walk would pick up.
    pub fn read(path: &Path) -> Self {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if !meta.is_file() => return ReadOutcome::Missing(io::ErrorKind::InvalidInput),
            Ok(_) => {}
            Err(e) => return ReadOutcome::Missing(e.kind()),
        }

        match std::fs::read(path) {
            Ok(content) => ReadOutcome::Content(content),
            Err(e) => ReadOutcome::Missing(e.kind()),
        }
    }
}

/// Per-path state for one reconciliation pass
///
/// Entries carry a sequence number so materialization follows the order in
/// which paths were (re)inserted.
#[derive(Debug, Default)]
pub struct Tracker {
    entries: AHashMap<String, (u64, TrackedStatus)>,
    next_seq: u64,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event for `rel_path` into the tracked state
    pub fn observe(&mut self, rel_path: &str, kind: EventKind, is_directory: bool) {
        let existing = self.status(rel_path);

        match Transition::of(existing, kind, is_directory) {
            Transition::Set(status) => match self.entries.get_mut(rel_path) {
                Some(entry) => entry.1 = status,
                None => self.insert(rel_path, status),
            },
            Transition::Keep | Transition::Ignore => {}
            Transition::Remove => {
                self.entries.remove(rel_path);
            }
            Transition::CascadeDelete => {
                let before = self.entries.len();
                self.entries.retain(|path, _| !is_nested_under(path, rel_path));
                let dropped = before - self.entries.len();
                if dropped > 0 {
                    debug!("Directory delete {} supersedes {} pending changes", rel_path, dropped);
                }

                self.entries.remove(rel_path);
                self.insert(rel_path, TrackedStatus::Delete);
            }
        }
    }

    /// Current status of a path, if tracked
    pub fn status(&self, rel_path: &str) -> Option<TrackedStatus> {
        self.entries.get(rel_path).map(|(_, status)| *status)
    }

    /// Number of tracked paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked paths in materialization order
    pub fn tracked(&self) -> Vec<(&str, TrackedStatus)> {
        let mut ordered: Vec<_> = self
            .entries
            .iter()
            .map(|(path, (seq, status))| (*seq, path.as_str(), *status))
            .collect();
        ordered.sort_unstable_by_key(|(seq, _, _)| *seq);
        ordered.into_iter().map(|(_, path, status)| (path, status)).collect()
    }

    /// Build the change set, reading upserted files from `source_root`
    pub fn materialize(&self, source_root: &Path) -> ChangeSet {
        let mut changes = ChangeSet::new();

        for (path, status) in self.tracked() {
            match status {
                TrackedStatus::Delete => changes.push(Change::delete(path)),
                TrackedStatus::Upsert => {
                    let full = match resolve(source_root, path) {
                        Ok(full) => full,
                        Err(e) => {
                            debug!("Skipping unresolvable path {}: {}", path, e);
                            continue;
                        }
                    };

                    match ReadOutcome::read(&full) {
                        ReadOutcome::Content(content) => changes.push(Change::upsert(path, content)),
                        ReadOutcome::Missing(kind) => {
                            debug!("Omitting {} (unreadable at reconcile time: {:?})", path, kind);
                        }
                    }
                }
            }
        }

        changes
    }

    fn insert(&mut self, rel_path: &str, status: TrackedStatus) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(rel_path.to_string(), (seq, status));
    }
}

/// Reconcile one batch of events under `source_root` into a change set
///
/// Events are processed in arrival order. Events outside the root, or for the
/// root itself, are skipped. The batch is not modified.
pub fn reconcile(source_root: &Path, batch: &[RawEvent]) -> ChangeSet {
    let mut tracker = Tracker::new();

    for event in batch {
        match relative_path(source_root, &event.path) {
            Ok(rel) => tracker.observe(&rel, event.kind, event.is_directory),
            Err(e) => debug!("Ignoring event for {}: {}", event.path.display(), e),
        }
    }

    let changes = tracker.materialize(source_root);
    debug!(
        "Reconciled {} events into {} changes ({} tracked)",
        batch.len(),
        changes.len(),
        tracker.len()
    );
    changes
}
