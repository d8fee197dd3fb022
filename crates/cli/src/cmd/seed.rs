//! One-shot full copy of a source tree

use crate::{system_config, util};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use mirror_core::snapshot::snapshot_filtered;
use mirror_core::{apply, ApplyStats, ChangeSet};
use owo_colors::OwoColorize;
use std::path::Path;
use tracing::info;

/// Files written per apply call; bounds progress granularity
const CHUNK: usize = 32;

pub async fn run(source: &Path, target: &Path) -> Result<()> {
    let config = system_config::load()?;
    let source = util::resolve_source(source)?;
    let target = util::resolve_target(&source, target)?;
    let rules = util::ignore_rules(&source, &config.ignore)?;

    let snapshot = snapshot_filtered(&source, |rel, is_dir| {
        rules.should_ignore(Path::new(rel), is_dir)
    })
    .with_context(|| format!("Failed to snapshot {}", source.display()))?;
    let total_bytes = snapshot.total_bytes();

    let progress = ProgressBar::new(snapshot.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );

    let mut stats = ApplyStats::default();
    let mut pending = ChangeSet::new();
    for change in snapshot.into_change_set() {
        pending.push(change);
        if pending.len() >= CHUNK {
            flush(&target, &mut pending, &mut stats, &progress)?;
        }
    }
    flush(&target, &mut pending, &mut stats, &progress)?;
    progress.finish_and_clear();

    info!("Seeded {} files into {}", stats.written, target.display());
    println!(
        "{} Seeded {} files ({}) into {}",
        "✓".green(),
        stats.written,
        util::format_size(total_bytes),
        target.display()
    );
    Ok(())
}

fn flush(
    target: &Path,
    pending: &mut ChangeSet,
    stats: &mut ApplyStats,
    progress: &ProgressBar,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }

    let batch = std::mem::take(pending);
    let applied = apply(target, &batch)?;
    stats.written += applied.written;
    stats.deleted += applied.deleted;
    stats.skipped += applied.skipped;
    progress.inc(batch.len() as u64);
    Ok(())
}
