//! mirrorsync CLI - msync command

use anyhow::Result;
use clap::{Parser, Subcommand};
use mirror_watcher::Strategy;
use std::path::PathBuf;

mod cmd;
mod logging;
mod system_config;
mod util;

/// mirrorsync - one-way live directory replication
#[derive(Parser)]
#[command(name = "msync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replicate SOURCE into TARGET until interrupted
    Watch {
        /// Directory to watch
        source: PathBuf,
        /// Directory to keep in sync
        target: PathBuf,
        /// Quiescence window in milliseconds (overrides config)
        #[arg(long)]
        window_ms: Option<u64>,
        /// Replication strategy: diff or archive (overrides config)
        #[arg(long)]
        strategy: Option<Strategy>,
        /// Skip the initial full copy
        #[arg(long)]
        no_seed: bool,
    },
    /// Copy every file of SOURCE into TARGET once
    Seed {
        source: PathBuf,
        target: PathBuf,
    },
    /// Write a tar.gz snapshot of SOURCE
    Pack {
        source: PathBuf,
        /// Output archive path
        archive: PathBuf,
    },
    /// Replace the contents of TARGET with an archive
    Unpack {
        archive: PathBuf,
        target: PathBuf,
    },
    /// Compare SOURCE and TARGET
    Status {
        source: PathBuf,
        target: PathBuf,
    },
    /// View or edit the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show all values
    List,
    /// Print one value (e.g. sync.window_ms)
    Get { key: String },
    /// Set one value
    Set { key: String, value: String },
    /// Show the config file location
    Path {
        /// Create the file with example contents if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so file logs are flushed
    let _log_guard = logging::init(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Watch {
            source,
            target,
            window_ms,
            strategy,
            no_seed,
        } => {
            let overrides = cmd::watch::Overrides {
                window_ms,
                strategy,
                no_seed,
            };
            cmd::watch::run(&source, &target, overrides).await
        }
        Commands::Seed { source, target } => cmd::seed::run(&source, &target).await,
        Commands::Pack { source, archive } => cmd::pack::run(&source, &archive).await,
        Commands::Unpack { archive, target } => cmd::unpack::run(&archive, &target).await,
        Commands::Status { source, target } => cmd::status::run(&source, &target).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
