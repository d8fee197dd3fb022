//! Shared helpers for CLI commands

use anyhow::{Context, Result};
use mirror_watcher::{IgnoreConfig, IgnoreRules};
use std::path::{Path, PathBuf};

/// Resolve an existing source directory
pub fn resolve_source(source: &Path) -> Result<PathBuf> {
    let resolved = source
        .canonicalize()
        .with_context(|| format!("Source directory not found: {}", source.display()))?;
    if !resolved.is_dir() {
        anyhow::bail!("Source is not a directory: {}", source.display());
    }
    Ok(resolved)
}

/// Resolve a target directory, creating it if needed
///
/// Fails when source and target overlap.
pub fn resolve_target(source: &Path, target: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(target)
        .with_context(|| format!("Failed to create target {}", target.display()))?;
    let resolved = target
        .canonicalize()
        .with_context(|| format!("Failed to resolve target {}", target.display()))?;

    if resolved.starts_with(source) || source.starts_with(&resolved) {
        anyhow::bail!(
            "Source and target must not contain each other: {} / {}",
            source.display(),
            resolved.display()
        );
    }
    Ok(resolved)
}

/// Load ignore rules for `root` from the user configuration
pub fn ignore_rules(root: &Path, config: &IgnoreConfig) -> Result<IgnoreRules> {
    IgnoreRules::load(root, config.clone())
        .with_context(|| format!("Failed to load ignore rules for {}", root.display()))
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_resolve_target_rejects_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let source = resolve_source(temp_dir.path()).unwrap();

        assert!(resolve_target(&source, &source.join("inner")).is_err());
        assert!(resolve_target(&source.join("inner"), &source).is_err());
    }

    #[test]
    fn test_resolve_target_creates_directory() {
        let source_dir = TempDir::new().unwrap();
        let target_dir = TempDir::new().unwrap();
        let source = resolve_source(source_dir.path()).unwrap();

        let target = resolve_target(&source, &target_dir.path().join("a/b")).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_resolve_source_missing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(resolve_source(&temp_dir.path().join("nope")).is_err());
    }
}
