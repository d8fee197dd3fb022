//! Replication strategies: per-file diffs or whole-tree archives

use crate::ignore::IgnoreRules;
use crate::reconcile::reconcile;
use crate::RawEvent;
use anyhow::{Context, Result};
use mirror_core::snapshot::snapshot_filtered;
use mirror_core::{archive, ChangeSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How a batch is turned into something the target can apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Reconcile the batch into a minimal change set
    #[default]
    Diff,
    /// Any activity re-sends the whole tree as an archive
    Archive,
}

/// What a strategy ships from source to target
#[derive(Debug, Clone)]
pub enum Payload {
    Changes(ChangeSet),
    /// tar.gz of the full source tree
    Archive(Vec<u8>),
}

impl Strategy {
    /// Build the payload for one emitted batch
    pub fn collect(&self, source: &Path, batch: &[RawEvent], rules: &IgnoreRules) -> Result<Payload> {
        match self {
            Strategy::Diff => Ok(Payload::Changes(reconcile(source, batch))),
            Strategy::Archive => {
                if batch.is_empty() {
                    return Ok(Payload::Changes(ChangeSet::new()));
                }
                pack(source, rules).map(Payload::Archive)
            }
        }
    }

    /// Build the payload that seeds an empty target with the full source
    pub fn seed(&self, source: &Path, rules: &IgnoreRules) -> Result<Payload> {
        match self {
            Strategy::Diff => {
                let snapshot =
                    snapshot_filtered(source, |rel, is_dir| rules.should_ignore(Path::new(rel), is_dir))
                        .with_context(|| format!("Failed to snapshot {}", source.display()))?;
                Ok(Payload::Changes(snapshot.into_change_set()))
            }
            Strategy::Archive => pack(source, rules).map(Payload::Archive),
        }
    }
}

fn pack(source: &Path, rules: &IgnoreRules) -> Result<Vec<u8>> {
    archive::pack_filtered(source, |rel, is_dir| rules.should_ignore(Path::new(rel), is_dir))
        .with_context(|| format!("Failed to pack {}", source.display()))
}

impl Payload {
    /// Apply to `target`, returning the number of files touched
    pub fn apply(&self, target: &Path) -> Result<usize> {
        match self {
            Payload::Changes(changes) => {
                let stats = mirror_core::apply(target, changes)?;
                Ok(stats.total())
            }
            Payload::Archive(bytes) => {
                archive::replace(target, bytes)?;
                Ok(1)
            }
        }
    }

    /// Whether applying would be a no-op
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Changes(changes) => changes.is_empty(),
            Payload::Archive(_) => false,
        }
    }

    /// Short human-readable summary for logs
    pub fn describe(&self) -> String {
        match self {
            Payload::Changes(changes) => format!("{} changes", changes.len()),
            Payload::Archive(bytes) => format!("archive of {} bytes", bytes.len()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Diff => write!(f, "diff"),
            Strategy::Archive => write!(f, "archive"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "diff" => Ok(Strategy::Diff),
            "archive" => Ok(Strategy::Archive),
            other => anyhow::bail!("Unknown strategy '{}' (expected 'diff' or 'archive')", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventKind;
    use mirror_core::snapshot::{snapshot, SnapshotDiff};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_strategy_parse_and_display() {
        assert_eq!("diff".parse::<Strategy>().unwrap(), Strategy::Diff);
        assert_eq!("archive".parse::<Strategy>().unwrap(), Strategy::Archive);
        assert!("rsync".parse::<Strategy>().is_err());
        assert_eq!(Strategy::Archive.to_string(), "archive");
    }

    #[test]
    fn test_seed_skips_ignored() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join(".git")).unwrap();
        fs::write(source.path().join(".git/HEAD"), b"ref").unwrap();
        fs::write(source.path().join("a.txt"), b"a").unwrap();

        let rules = IgnoreRules::builtin_only(source.path());
        for strategy in [Strategy::Diff, Strategy::Archive] {
            let payload = strategy.seed(source.path(), &rules).unwrap();
            payload.apply(target.path()).unwrap();

            assert_eq!(fs::read(target.path().join("a.txt")).unwrap(), b"a");
            assert!(!target.path().join(".git").exists());
        }
    }

    #[test]
    fn test_archive_collect_replaces_target() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(source.path().join("new.txt"), b"new").unwrap();
        fs::write(target.path().join("stale.txt"), b"stale").unwrap();

        let rules = IgnoreRules::builtin_only(source.path());
        let batch = vec![RawEvent::file(source.path().join("new.txt"), EventKind::Created)];
        let payload = Strategy::Archive.collect(source.path(), &batch, &rules).unwrap();
        payload.apply(target.path()).unwrap();

        let diff = SnapshotDiff::between(
            &snapshot(source.path()).unwrap(),
            &snapshot(target.path()).unwrap(),
        );
        assert!(diff.is_empty(), "{:?}", diff);
    }

    #[test]
    fn test_archive_collect_empty_batch_is_noop() {
        let source = TempDir::new().unwrap();
        let rules = IgnoreRules::builtin_only(source.path());

        let payload = Strategy::Archive.collect(source.path(), &[], &rules).unwrap();
        assert!(payload.is_empty());
    }
}
