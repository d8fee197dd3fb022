//! User configuration file
//!
//! Lives at `<config dir>/mirrorsync/config.toml`, or wherever `MSYNC_CONFIG`
//! points. A missing file means defaults.

use anyhow::{Context, Result};
use mirror_watcher::{IgnoreConfig, SessionConfig, Strategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "MSYNC_CONFIG";

const WINDOW_RANGE: (u64, u64) = (10, 60_000);
const IDLE_POLL_RANGE: (u64, u64) = (10, 60_000);

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// `[sync]` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSection {
    /// Quiescence window in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Maximum driver sleep between checks, in milliseconds
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,

    #[serde(default)]
    pub strategy: Strategy,

    /// Copy the full source before watching
    #[serde(default = "default_true")]
    pub seed_on_start: bool,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            strategy: Strategy::default(),
            seed_on_start: true,
        }
    }
}

fn default_window_ms() -> u64 {
    100
}

fn default_idle_poll_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}

impl SyncConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        check_range("sync.window_ms", self.sync.window_ms, WINDOW_RANGE)?;
        check_range("sync.idle_poll_ms", self.sync.idle_poll_ms, IDLE_POLL_RANGE)?;
        Ok(())
    }

    /// Session settings derived from this file
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            window: Duration::from_millis(self.sync.window_ms),
            idle_poll: Duration::from_millis(self.sync.idle_poll_ms),
            strategy: self.sync.strategy,
            seed_on_start: self.sync.seed_on_start,
            ignore: self.ignore.clone(),
        }
    }
}

fn check_range(key: &str, value: u64, (min, max): (u64, u64)) -> Result<()> {
    if value < min || value > max {
        anyhow::bail!("{} must be between {} and {} (got {})", key, min, max, value);
    }
    Ok(())
}

/// Location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("mirrorsync").join("config.toml"))
}

/// Load the user configuration, falling back to defaults
pub fn load() -> Result<SyncConfig> {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => Ok(SyncConfig::default()),
    }
}

pub fn load_from(path: &Path) -> Result<SyncConfig> {
    if !path.exists() {
        return Ok(SyncConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: SyncConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    Ok(config)
}

/// Write the configuration back to its file
pub fn save(config: &SyncConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;
    save_to(config, &path)
}

pub fn save_to(config: &SyncConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    Ok(())
}

/// Create the config file with the example contents if it does not exist
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, example_config())
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
    }
    Ok(path)
}

/// Commented example configuration
pub fn example_config() -> &'static str {
    r#"# mirrorsync configuration

[sync]
# Quiet period after the last change before a batch is replicated (10-60000)
window_ms = 100
# Longest the sync loop sleeps between checks (10-60000)
idle_poll_ms = 250
# "diff" sends changed files, "archive" re-sends the whole tree
strategy = "diff"
# Copy the full source into the target before watching
seed_on_start = true

[ignore]
use_gitignore = true
use_msyncignore = true
# Extra patterns in .gitignore syntax
additional_patterns = ["*.log", "target/"]
"#
}
