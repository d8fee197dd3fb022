//! File system watching and change tracking for mirrorsync
//!
//! This crate turns raw notifications into replicated changes:
//! - Quiescence-window batching (injected clock)
//! - Per-batch reconciliation into a minimal change set
//! - Ignore rules (.gitignore/.msyncignore/config)
//! - notify-backed watcher and the sync session driver

pub mod debounce;
pub mod ignore;
pub mod reconcile;
pub mod session;
pub mod strategy;
pub mod watch;

pub use debounce::{Clock, Debouncer, ManualClock, SystemClock};
pub use crate::ignore::{IgnoreConfig, IgnoreRules};
pub use reconcile::{reconcile, ReadOutcome, TrackedStatus, Tracker};
pub use session::{SessionConfig, SessionReport, SyncSession};
pub use strategy::{Payload, Strategy};
pub use watch::{FsWatcher, WatchError};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw file system event as delivered by the watch mechanism
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Absolute path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
    /// Whether the path refers to a directory
    pub is_directory: bool,
}

impl RawEvent {
    pub fn file(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
            is_directory: false,
        }
    }

    pub fn dir(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
            is_directory: true,
        }
    }
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Path created
    Created,
    /// Content or metadata modified
    Modified,
    /// Path deleted
    Deleted,
}
