//! Filesystem helpers shared by the applier, snapshots and archives

use crate::error::PathError;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

/// Atomic write helper
///
/// Writes data to a temporary file in the destination directory, fsyncs it,
/// then renames it over the target path. Readers see either the old file or
/// the complete new one.
pub fn atomic_write(target: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match target.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"));
        }
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".msync-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;

    // Directory fsync makes the rename durable; not supported everywhere
    #[cfg(unix)]
    if let Ok(dir_handle) = std::fs::File::open(dir) {
        let _ = dir_handle.sync_all();
    }

    Ok(())
}

/// Remove a file or a whole directory subtree
///
/// Returns `Ok(false)` when nothing existed at `path`.
pub fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        // Raced with another remover
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Compute the `/`-separated path of `path` relative to `root`
///
/// - Rejects paths outside the root and the root itself
/// - Rejects `..` components
/// - Drops `./` components
pub fn relative_path(root: &Path, path: &Path) -> Result<String, PathError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| PathError::OutsideRoot(path.to_path_buf(), root.to_path_buf()))?;
    normalize_relative(rel)
}

/// Normalize an already relative path to the `/`-separated form
pub fn normalize_relative(rel: &Path) -> Result<String, PathError> {
    let mut parts: Vec<&str> = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str().ok_or(PathError::NonUtf8)?),
            Component::CurDir => {}
            Component::ParentDir => return Err(PathError::ParentComponent),
            Component::RootDir | Component::Prefix(_) => return Err(PathError::Absolute),
        }
    }

    if parts.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(parts.join("/"))
}

/// Join a `/`-separated relative path onto `root`, validating it first
pub fn resolve(root: &Path, rel: &str) -> Result<PathBuf, PathError> {
    let normalized = normalize_relative(Path::new(rel))?;
    let mut full = root.to_path_buf();
    full.extend(normalized.split('/'));
    Ok(full)
}

/// Whether `path` lies strictly beneath the directory `dir` (both relative)
pub fn is_nested_under(path: &str, dir: &str) -> bool {
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}
