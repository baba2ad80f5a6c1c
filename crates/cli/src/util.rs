//! Shared utilities for CLI commands

use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use folio_core::{FolderSettings, SortOrder};
use std::path::{Path, PathBuf};
use store::FileStore;

/// Open the data directory named by `config`
pub fn open_store(config: &SystemConfig) -> Result<FileStore> {
    let data_dir = config.data_dir()?;
    FileStore::open(&data_dir)
        .with_context(|| format!("Failed to open data directory {}", data_dir.display()))
}

/// Canonical path of an existing directory
pub fn existing_folder(path: &Path) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Folder not found: {}", path.display()))?;
    if !canonical.is_dir() {
        anyhow::bail!("Not a directory: {}", canonical.display());
    }
    Ok(canonical)
}

/// Absolute form of `path`, canonical when it still exists
///
/// Used for removals, where the folder may already be gone.
pub fn absolute_folder(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = path.canonicalize() {
        return Ok(canonical);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(path))
}

/// Settings from optional `--max-items` / `--sort` flags over config defaults
pub fn folder_settings(
    config: &SystemConfig,
    max_items: Option<usize>,
    sort: Option<&str>,
) -> Result<FolderSettings> {
    let defaults = config.listing_defaults();
    let sort_order = match sort {
        Some(name) => name
            .parse::<SortOrder>()
            .context("Run 'folio sorts' to see accepted names")?,
        None => defaults.sort_order,
    };
    if max_items == Some(0) {
        anyhow::bail!("--max-items must be at least 1");
    }
    Ok(FolderSettings::new(max_items.unwrap_or(defaults.max_items), sort_order))
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - ts).num_seconds();
    if seconds < 0 {
        return "in the future".to_string();
    }

    if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format file size in human-readable format
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
