//! Configuration management command
//!
//! Provides CLI interface to view and edit the configuration file.

use crate::system_config::{self, SyncConfig};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[sync]".yellow());
    println!(
        "  {} = {} {}",
        "window_ms".cyan(),
        config.sync.window_ms,
        format!("({}ms quiet period)", config.sync.window_ms).dimmed()
    );
    println!("  {} = {}", "idle_poll_ms".cyan(), config.sync.idle_poll_ms);
    println!("  {} = {}", "strategy".cyan(), config.sync.strategy);
    println!("  {} = {}", "seed_on_start".cyan(), config.sync.seed_on_start);

    println!("\n{}", "[ignore]".yellow());
    println!("  {} = {}", "use_gitignore".cyan(), config.ignore.use_gitignore);
    println!("  {} = {}", "use_msyncignore".cyan(), config.ignore.use_msyncignore);
    println!(
        "  {} = {}",
        "additional_patterns".cyan(),
        if config.ignore.additional_patterns.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            config.ignore.additional_patterns.join(", ")
        }
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  window_ms: 10-60,000");
    println!("  idle_poll_ms: 10-60,000");
    println!("  strategy: diff | archive");

    Ok(())
}

/// Read a single value by dotted key
pub fn get_value(config: &SyncConfig, key: &str) -> Result<String> {
    let value = match key {
        "sync.window_ms" => config.sync.window_ms.to_string(),
        "sync.idle_poll_ms" => config.sync.idle_poll_ms.to_string(),
        "sync.strategy" => config.sync.strategy.to_string(),
        "sync.seed_on_start" => config.sync.seed_on_start.to_string(),
        "ignore.use_gitignore" => config.ignore.use_gitignore.to_string(),
        "ignore.use_msyncignore" => config.ignore.use_msyncignore.to_string(),
        "ignore.additional_patterns" => config.ignore.additional_patterns.join(","),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'msync config list' to see available keys.",
            key
        ),
    };
    Ok(value)
}

/// Update a single value by dotted key, then validate
pub fn set_value(config: &mut SyncConfig, key: &str, value: &str) -> Result<()> {
    match key {
        "sync.window_ms" => {
            config.sync.window_ms = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "sync.idle_poll_ms" => {
            config.sync.idle_poll_ms = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "sync.strategy" => {
            config.sync.strategy = value.parse()?;
        }
        "sync.seed_on_start" => {
            config.sync.seed_on_start = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "ignore.use_gitignore" => {
            config.ignore.use_gitignore = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "ignore.use_msyncignore" => {
            config.ignore.use_msyncignore = value
                .parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        // Comma-separated; an empty value clears the list
        "ignore.additional_patterns" => {
            config.ignore.additional_patterns = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'msync config list' to see available keys.",
            key
        ),
    }

    config.validate().context("Invalid configuration value")
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;
    println!("{}", get_value(&config, key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    set_value(&mut config, key, value)?;
    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    println!(
        "{}",
        "Note: running 'msync watch' sessions pick this up on restart".yellow()
    );

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_watcher::Strategy;

    #[test]
    fn test_set_then_get() {
        let mut config = SyncConfig::default();

        set_value(&mut config, "sync.window_ms", "250").unwrap();
        set_value(&mut config, "sync.strategy", "archive").unwrap();
        set_value(&mut config, "ignore.additional_patterns", "*.log, build/ ,").unwrap();

        assert_eq!(get_value(&config, "sync.window_ms").unwrap(), "250");
        assert_eq!(config.sync.strategy, Strategy::Archive);
        assert_eq!(
            get_value(&config, "ignore.additional_patterns").unwrap(),
            "*.log,build/"
        );
    }

    #[test]
    fn test_set_rejects_out_of_range() {
        let mut config = SyncConfig::default();
        assert!(set_value(&mut config, "sync.window_ms", "1").is_err());
        assert!(set_value(&mut config, "sync.seed_on_start", "maybe").is_err());
    }

    #[test]
    fn test_unknown_key() {
        let mut config = SyncConfig::default();
        assert!(get_value(&config, "daemon.pid").is_err());
        assert!(set_value(&mut config, "daemon.pid", "1").is_err());
    }
}
