//! Sync session driver
//!
//! Owns the watcher and the debouncer for one source/target pair and runs
//! the emit → collect → apply loop until shutdown.

use crate::debounce::Debouncer;
use crate::ignore::{IgnoreConfig, IgnoreRules};
use crate::strategy::Strategy;
use crate::watch::FsWatcher;
use crate::RawEvent;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiescence window of the batcher
    pub window: Duration,
    /// Upper bound on how long the driver sleeps between checks
    pub idle_poll: Duration,
    pub strategy: Strategy,
    /// Copy the whole source into the target before replicating events
    pub seed_on_start: bool,
    pub ignore: IgnoreConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(100),
            idle_poll: Duration::from_millis(250),
            strategy: Strategy::Diff,
            seed_on_start: true,
            ignore: IgnoreConfig::default(),
        }
    }
}

/// Totals for a finished session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Batches that produced a non-empty payload
    pub batches: usize,
    /// Files written or deleted on the target (archive replaces count once)
    pub changes_applied: usize,
}

/// One-directional replication from `source` to `target`
pub struct SyncSession {
    config: SessionConfig,
    source: PathBuf,
    target: PathBuf,
    rules: Arc<IgnoreRules>,
}

impl SyncSession {
    /// Create a session; the target directory is created if needed
    pub fn new(config: SessionConfig, source: &Path, target: &Path) -> Result<Self> {
        // notify reports canonical paths, so the root must match them
        let source = source
            .canonicalize()
            .with_context(|| format!("Source directory not found: {}", source.display()))?;
        if !source.is_dir() {
            anyhow::bail!("Source is not a directory: {}", source.display());
        }

        std::fs::create_dir_all(target)
            .with_context(|| format!("Failed to create target {}", target.display()))?;
        let target = target
            .canonicalize()
            .with_context(|| format!("Failed to resolve target {}", target.display()))?;

        if target.starts_with(&source) || source.starts_with(&target) {
            anyhow::bail!(
                "Source and target must not contain each other: {} / {}",
                source.display(),
                target.display()
            );
        }

        let rules = IgnoreRules::load(&source, config.ignore.clone())?;
        debug!("Loaded {} ignore sources", rules.active_sources());

        Ok(Self {
            config,
            source,
            target,
            rules: Arc::new(rules),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Copy the full source tree into the target
    ///
    /// Returns the number of files touched.
    pub fn seed(&self) -> Result<usize> {
        let payload = self.config.strategy.seed(&self.source, &self.rules)?;
        let applied = payload
            .apply(&self.target)
            .with_context(|| format!("Failed to seed {}", self.target.display()))?;
        info!(
            "Seeded {} from {} ({})",
            self.target.display(),
            self.source.display(),
            payload.describe()
        );
        Ok(applied)
    }

    /// Process one emitted batch synchronously
    ///
    /// Returns `None` when the batch reconciled to nothing.
    pub fn process_batch(&self, batch: &[RawEvent]) -> Result<Option<usize>> {
        process_batch(
            self.config.strategy,
            &self.source,
            &self.target,
            &self.rules,
            batch,
        )
    }

    /// Watch the source and replicate until `shutdown` flips to true
    ///
    /// Watch failures and apply failures end the session with an error.
    /// Events still pending in the batcher at shutdown are dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<SessionReport> {
        // Watch before seeding: writes that land during the seed are buffered
        // and replayed afterwards, which is idempotent
        let debouncer: Arc<Debouncer<RawEvent>> = Arc::new(Debouncer::new(self.config.window));
        let watcher = FsWatcher::start(&self.source, self.rules.clone(), debouncer.clone())?;

        if self.config.seed_on_start {
            let (strategy, source, target, rules) = self.owned_parts();
            tokio::task::spawn_blocking(move || {
                let payload = strategy.seed(&source, &rules)?;
                payload.apply(&target)
            })
            .await
            .context("Seed task panicked")??;
            info!(
                "Initial seed complete ({} events buffered meanwhile)",
                debouncer.pending_len()
            );
        }

        info!(
            "Syncing {} -> {} (strategy: {}, window: {:?})",
            self.source.display(),
            self.target.display(),
            self.config.strategy,
            self.config.window
        );

        let mut report = SessionReport::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            watcher.check()?;

            if let Some(batch) = debouncer.try_emit() {
                debug!("Emitted batch of {} events", batch.len());

                let (strategy, source, target, rules) = self.owned_parts();
                let applied = tokio::task::spawn_blocking(move || {
                    process_batch(strategy, &source, &target, &rules, &batch)
                })
                .await
                .context("Apply task panicked")??;

                if let Some(applied) = applied {
                    report.batches += 1;
                    report.changes_applied += applied;
                }
                continue;
            }

            let wait = debouncer
                .time_until_next_emission()
                .map_or(self.config.idle_poll, |d| d.min(self.config.idle_poll));

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    // Sender dropped counts as shutdown
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let dropped = debouncer.pending_len();
        if dropped > 0 {
            warn!("Dropping {} pending events at shutdown", dropped);
        }
        info!(
            "Sync session stopped: {} batches, {} changes applied",
            report.batches, report.changes_applied
        );

        Ok(report)
    }

    fn owned_parts(&self) -> (Strategy, PathBuf, PathBuf, Arc<IgnoreRules>) {
        (
            self.config.strategy,
            self.source.clone(),
            self.target.clone(),
            self.rules.clone(),
        )
    }
}

fn process_batch(
    strategy: Strategy,
    source: &Path,
    target: &Path,
    rules: &IgnoreRules,
    batch: &[RawEvent],
) -> Result<Option<usize>> {
    let payload = strategy.collect(source, batch, rules)?;
    if payload.is_empty() {
        debug!("Batch of {} events reconciled to nothing", batch.len());
        return Ok(None);
    }

    let applied = payload
        .apply(target)
        .with_context(|| format!("Failed to apply {}", payload.describe()))?;
    info!("Applied {} ({} events)", payload.describe(), batch.len());
    Ok(Some(applied))
}
