//! Replace a target tree with the contents of an archive

use anyhow::{Context, Result};
use mirror_core::archive;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(archive_path: &Path, target: &Path) -> Result<()> {
    let bytes = std::fs::read(archive_path)
        .with_context(|| format!("Failed to read archive {}", archive_path.display()))?;

    std::fs::create_dir_all(target)
        .with_context(|| format!("Failed to create target {}", target.display()))?;
    archive::replace(target, &bytes)
        .with_context(|| format!("Failed to unpack into {}", target.display()))?;

    println!(
        "{} Replaced {} with {}",
        "✓".green(),
        target.display(),
        archive_path.display()
    );
    Ok(())
}
