//! Write a tar.gz snapshot of a source tree

use crate::{system_config, util};
use anyhow::{Context, Result};
use mirror_core::archive;
use mirror_core::fs::atomic_write;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(source: &Path, archive_path: &Path) -> Result<()> {
    let config = system_config::load()?;
    let source = util::resolve_source(source)?;
    let rules = util::ignore_rules(&source, &config.ignore)?;

    let bytes = archive::pack_filtered(&source, |rel, is_dir| {
        rules.should_ignore(Path::new(rel), is_dir)
    })
    .with_context(|| format!("Failed to pack {}", source.display()))?;

    if let Some(parent) = archive_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    atomic_write(archive_path, &bytes)
        .with_context(|| format!("Failed to write {}", archive_path.display()))?;

    println!(
        "{} Packed {} into {} ({})",
        "✓".green(),
        source.display(),
        archive_path.display(),
        util::format_size(bytes.len() as u64)
    );
    Ok(())
}
