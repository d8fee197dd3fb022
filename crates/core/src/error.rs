//! Error types for applying changes to a target tree

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while applying a change set to the target tree
///
/// Every variant names the relative path whose operation failed so the
/// caller can report it.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// An I/O operation on the target failed
    #[error("failed to {op} '{path}': {source}")]
    Io {
        /// Relative path of the change
        path: String,
        /// Operation that failed ("write", "delete", "create parent of")
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The change carried a path that cannot be placed under the target root
    #[error("invalid relative path '{path}': {reason}")]
    InvalidPath {
        path: String,
        reason: PathError,
    },
}

impl ApplyError {
    /// Relative path of the change that failed
    pub fn path(&self) -> &str {
        match self {
            ApplyError::Io { path, .. } | ApplyError::InvalidPath { path, .. } => path,
        }
    }

    pub(crate) fn io(path: &str, op: &'static str, source: io::Error) -> Self {
        ApplyError::Io {
            path: path.to_string(),
            op,
            source,
        }
    }
}

/// Reasons a path is rejected as a relative tree path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path is absolute")]
    Absolute,
    #[error("path escapes the root via '..'")]
    ParentComponent,
    #[error("path '{}' is not under root '{}'", .0.display(), .1.display())]
    OutsideRoot(PathBuf, PathBuf),
    #[error("path is not valid UTF-8")]
    NonUtf8,
}
