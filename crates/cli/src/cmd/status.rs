//! Compare a source tree with its replica

use crate::{system_config, util};
use anyhow::{Context, Result};
use mirror_core::snapshot::{snapshot_filtered, Snapshot};
use mirror_core::SnapshotDiff;
use mirror_watcher::IgnoreRules;
use owo_colors::OwoColorize;
use std::path::Path;

/// Paths listed per section before truncating
const MAX_LISTED: usize = 20;

pub async fn run(source: &Path, target: &Path) -> Result<()> {
    let config = system_config::load()?;
    let source = util::resolve_source(source)?;
    let rules = util::ignore_rules(&source, &config.ignore)?;

    let left = filtered_snapshot(&source, &rules)?;
    let right = if target.is_dir() {
        filtered_snapshot(target, &rules)?
    } else {
        Snapshot::default()
    };
    let diff = SnapshotDiff::between(&left, &right);

    println!("{}", "Sync Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("Source:        {}", source.display().to_string().cyan());
    println!("Target:        {}", target.display().to_string().cyan());
    println!(
        "Files:         {} in source ({}), {} in target",
        left.len(),
        util::format_size(left.total_bytes()),
        right.len()
    );
    println!();

    if diff.is_empty() {
        println!("{}", "In sync ✓".green());
        return Ok(());
    }

    print_section("Missing from target", &diff.left_only, |p| p.green().to_string());
    print_section("Only in target", &diff.right_only, |p| p.red().to_string());
    print_section("Content differs", &diff.differing, |p| p.yellow().to_string());

    println!(
        "{}",
        "Tip: run 'msync seed' or 'msync watch' to bring the target up to date".dimmed()
    );
    Ok(())
}

fn filtered_snapshot(root: &Path, rules: &IgnoreRules) -> Result<Snapshot> {
    snapshot_filtered(root, |rel, is_dir| rules.should_ignore(Path::new(rel), is_dir))
        .with_context(|| format!("Failed to snapshot {}", root.display()))
}

fn print_section(title: &str, paths: &[String], paint: impl Fn(&str) -> String) {
    if paths.is_empty() {
        return;
    }

    println!("{} ({}):", title, paths.len());
    for path in paths.iter().take(MAX_LISTED) {
        println!("    {}", paint(path));
    }
    if paths.len() > MAX_LISTED {
        println!("    ... and {} more", paths.len() - MAX_LISTED);
    }
    println!();
}
