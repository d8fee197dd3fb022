//! Whole-tree archives for the full-replace strategy
//!
//! Instead of diffing, the archive strategy ships a gzip-compressed tar of the
//! entire source tree and replaces the target wholesale. Less precise, but it
//! needs no event bookkeeping at all.

use crate::fs::{relative_path, remove_path};
use crate::snapshot::vanished_walk_entry;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Pack every file and directory under `root` into tar.gz bytes
pub fn pack(root: &Path) -> Result<Vec<u8>> {
    pack_filtered(root, |_, _| false)
}

/// Pack `root`, skipping entries for which `skip(rel_path, is_dir)` is true
pub fn pack_filtered<F>(root: &Path, skip: F) -> Result<Vec<u8>>
where
    F: Fn(&str, bool) -> bool,
{
    // Fast compression: archives are rebuilt on every batch
    let encoder = GzEncoder::new(Vec::new(), Compression::fast());
    let mut archive = tar::Builder::new(encoder);
    archive.follow_symlinks(false);

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || relative_path(root, e.path())
                    .map(|rel| !skip(&rel, e.file_type().is_dir()))
                    .unwrap_or(false)
        });

    let mut files = 0usize;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if vanished_walk_entry(&e) => {
                debug!("Skipping entry removed during pack: {}", e);
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to walk {}", root.display()));
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let rel = relative_path(root, entry.path())
            .with_context(|| format!("Unrepresentable path {}", entry.path().display()))?;

        let appended = if entry.file_type().is_dir() {
            archive.append_dir(&rel, entry.path())
        } else if entry.file_type().is_file() {
            archive.append_path_with_name(entry.path(), &rel)
        } else {
            continue;
        };

        match appended {
            Ok(()) => {
                if entry.file_type().is_file() {
                    files += 1;
                }
            }
            // Removed between the walk and the read
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping {} (removed during pack)", rel);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to add {} to archive", rel));
            }
        }
    }

    let encoder = archive.into_inner().context("Failed to finalize archive")?;
    let bytes = encoder.finish().context("Failed to finish compression")?;

    debug!("Packed {} files from {} ({} bytes)", files, root.display(), bytes.len());
    Ok(bytes)
}

/// Replace everything under `target_root` with the contents of `archive`
///
/// The root directory itself is kept; all of its entries are removed first.
pub fn replace(target_root: &Path, archive: &[u8]) -> Result<()> {
    std::fs::create_dir_all(target_root)
        .with_context(|| format!("Failed to create {}", target_root.display()))?;

    clear_dir(target_root)?;
    unpack(target_root, archive)
}

/// Extract `archive` into `target_root` without clearing it first
pub fn unpack(target_root: &Path, archive: &[u8]) -> Result<()> {
    let mut tar = tar::Archive::new(GzDecoder::new(archive));
    tar.set_preserve_mtime(true);
    tar.unpack(target_root)
        .with_context(|| format!("Failed to extract archive into {}", target_root.display()))
}

/// Remove every entry inside `dir`, keeping `dir`
pub fn clear_dir(dir: &Path) -> Result<()> {
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        remove_path(&entry.path())
            .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{snapshot, SnapshotDiff};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_pack_replace_matches_source() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("sub/deeper")).unwrap();
        fs::write(source.path().join("a.txt"), b"alpha").unwrap();
        fs::write(source.path().join("sub/deeper/b.bin"), [0u8, 1, 2, 255]).unwrap();
        fs::create_dir_all(source.path().join("empty")).unwrap();

        // Stale content the replace must wipe
        fs::write(target.path().join("stale.txt"), b"old").unwrap();
        fs::create_dir_all(target.path().join("stale-dir")).unwrap();

        let bytes = pack(source.path()).unwrap();
        replace(target.path(), &bytes).unwrap();

        let diff = SnapshotDiff::between(
            &snapshot(source.path()).unwrap(),
            &snapshot(target.path()).unwrap(),
        );
        assert!(diff.is_empty(), "{:?}", diff);
        assert!(target.path().join("empty").is_dir());
        assert!(!target.path().join("stale-dir").exists());
    }

    #[test]
    fn test_pack_empty_tree() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::write(target.path().join("x"), b"x").unwrap();

        let bytes = pack(source.path()).unwrap();
        replace(target.path(), &bytes).unwrap();

        assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_pack_filtered_skips_entries() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        fs::create_dir_all(source.path().join(".git")).unwrap();
        fs::write(source.path().join(".git/HEAD"), b"ref").unwrap();
        fs::write(source.path().join("keep.txt"), b"k").unwrap();

        let bytes = pack_filtered(source.path(), |rel, _| rel == ".git").unwrap();
        unpack(target.path(), &bytes).unwrap();

        assert!(target.path().join("keep.txt").exists());
        assert!(!target.path().join(".git").exists());
    }

    #[test]
    fn test_file_removed_during_pack_is_skipped() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let root = source.path();
        fs::write(root.join("keep.txt"), b"keep").unwrap();
        fs::write(root.join("tmp.swx"), b"swap").unwrap();

        // Delete the swap file after it is listed but before it is appended
        let bytes = pack_filtered(root, |rel, _| {
            if rel == "tmp.swx" {
                let _ = fs::remove_file(root.join("tmp.swx"));
            }
            false
        })
        .unwrap();
        unpack(target.path(), &bytes).unwrap();

        assert_eq!(fs::read(target.path().join("keep.txt")).unwrap(), b"keep");
        assert!(!target.path().join("tmp.swx").exists());
    }

    #[test]
    fn test_replace_rejects_garbage() {
        let target = TempDir::new().unwrap();
        assert!(replace(target.path(), b"definitely not gzip").is_err());
    }
}
