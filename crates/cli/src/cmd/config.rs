//! Configuration management command
//!
//! View and edit `folio.toml`.

use crate::system_config::{self, SystemConfig, KEYS};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// List all configuration values
pub async fn run_list(config: &SystemConfig) -> Result<()> {
    let config_path = system_config::config_file_path()?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    let mut section = "";
    for key in KEYS {
        let (prefix, _) = key.split_once('.').unwrap_or((*key, ""));
        if prefix != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{}]", prefix).yellow());
            section = prefix;
        }
        let value = config.get(key)?;
        let value = if value.is_empty() { "(default)".dimmed().to_string() } else { value };
        println!("  {} = {}", key.cyan(), value);
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  watcher.debounce_ms: 50-60000");
    println!("  watcher.reconcile_interval_secs: 1-3600");
    println!("  refresh.max_concurrency: 1-16");
    println!("  refresh.priority: low | normal");
    println!("  listing.default_sort: see 'folio sorts'");
    println!("\n{}: {}", "Effective data directory".dimmed(), config.data_dir()?.display());

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(config: &SystemConfig, key: &str) -> Result<()> {
    println!("{}", config.get(key)?);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;
    config.set(key, value).context("Invalid configuration value")?;
    system_config::save(&config)?;

    println!("{} {} = {}", "Set".green(), key.cyan(), value);
    Ok(())
}
