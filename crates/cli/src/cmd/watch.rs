//! Live replication until Ctrl+C

use crate::system_config;
use anyhow::{Context, Result};
use mirror_watcher::{Strategy, SyncSession};
use owo_colors::OwoColorize;
use std::path::Path;
use tokio::sync::watch;
use tracing::info;

/// Command-line values that take precedence over the config file
#[derive(Debug, Default)]
pub struct Overrides {
    pub window_ms: Option<u64>,
    pub strategy: Option<Strategy>,
    pub no_seed: bool,
}

pub async fn run(source: &Path, target: &Path, overrides: Overrides) -> Result<()> {
    let mut config = system_config::load()?;

    if let Some(window_ms) = overrides.window_ms {
        config.sync.window_ms = window_ms;
    }
    if let Some(strategy) = overrides.strategy {
        config.sync.strategy = strategy;
    }
    if overrides.no_seed {
        config.sync.seed_on_start = false;
    }
    config.validate().context("Invalid sync options")?;

    let session = SyncSession::new(config.session_config(), source, target)?;

    println!(
        "{} {} {} {}",
        "Watching".green().bold(),
        session.source().display(),
        "→".dimmed(),
        session.target().display()
    );
    println!(
        "{}",
        format!(
            "strategy: {}, window: {}ms (Ctrl+C to stop)",
            config.sync.strategy, config.sync.window_ms
        )
        .dimmed()
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = session.run(shutdown_rx).await?;

    println!(
        "{} {} batches, {} changes applied",
        "✓".green(),
        report.batches,
        report.changes_applied
    );
    Ok(())
}
