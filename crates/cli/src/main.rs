//! Folio CLI - folio command

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::{cmd, logging, system_config};
use std::path::PathBuf;

/// Folio - cached, sorted listings of the folders you care about
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch favorites and sources, rebuilding listings as they change
    Watch,
    /// Manage favorite folders
    #[command(subcommand)]
    Favorite(FavoriteCommands),
    /// Manage dynamic source folders
    #[command(subcommand)]
    Source(SourceCommands),
    /// Rebuild a folder's cached listing now
    Refresh {
        /// Folder to rebuild
        path: PathBuf,
    },
    /// Print a folder's cached listing
    Show {
        /// Folder to show
        path: PathBuf,
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
        /// Show at most this many items
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show daemon and cache status
    Status,
    /// List accepted sort order names
    Sorts,
    /// View or edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum FavoriteCommands {
    /// Add or update a favorite folder
    Add {
        path: PathBuf,
        /// Display name (default: folder name)
        #[arg(long)]
        name: Option<String>,
        /// Number of items to keep
        #[arg(long)]
        max_items: Option<usize>,
        /// Sort order (see 'folio sorts')
        #[arg(long)]
        sort: Option<String>,
    },
    /// Remove a favorite folder
    Remove { path: PathBuf },
    /// List favorite folders
    List,
}

#[derive(Subcommand)]
enum SourceCommands {
    /// Add or update a dynamic source folder
    Add {
        path: PathBuf,
        /// Number of items to keep
        #[arg(long)]
        max_items: Option<usize>,
        /// Sort order (see 'folio sorts')
        #[arg(long)]
        sort: Option<String>,
    },
    /// Remove a dynamic source folder
    Remove { path: PathBuf },
    /// List dynamic source folders
    List,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all values
    List,
    /// Print one value
    Get { key: String },
    /// Set one value
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = system_config::load()?;

    // Held until exit so buffered log lines are flushed
    let _log_guard = match cli.command {
        Commands::Watch => Some(logging::init_daemon(&config.data_dir()?.join("logs"))?),
        _ => {
            logging::init_cli();
            None
        }
    };

    match cli.command {
        Commands::Watch => cmd::watch::run(&config).await,
        Commands::Favorite(favorite_cmd) => match favorite_cmd {
            FavoriteCommands::Add { path, name, max_items, sort } => {
                cmd::favorite::run_add(&config, &path, name.as_deref(), max_items, sort.as_deref()).await
            }
            FavoriteCommands::Remove { path } => cmd::favorite::run_remove(&config, &path).await,
            FavoriteCommands::List => cmd::favorite::run_list(&config).await,
        },
        Commands::Source(source_cmd) => match source_cmd {
            SourceCommands::Add { path, max_items, sort } => {
                cmd::source::run_add(&config, &path, max_items, sort.as_deref()).await
            }
            SourceCommands::Remove { path } => cmd::source::run_remove(&config, &path).await,
            SourceCommands::List => cmd::source::run_list(&config).await,
        },
        Commands::Refresh { path } => cmd::refresh::run(&config, &path).await,
        Commands::Show { path, json, limit } => cmd::show::run(&config, &path, json, limit).await,
        Commands::Status => cmd::status::run(&config).await,
        Commands::Sorts => {
            cmd::sorts::run();
            Ok(())
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list(&config).await,
            ConfigCommands::Get { key } => cmd::config::run_get(&config, &key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
        },
    }
}
