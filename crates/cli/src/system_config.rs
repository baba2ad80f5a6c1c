//! User configuration (`folio.toml`)
//!
//! Lives in the platform config directory unless `FOLIO_CONFIG` points
//! elsewhere. A missing file means defaults.

use anyhow::{Context, Result};
use folio_core::{Error, FolderSettings, SortOrder, DEFAULT_MAX_ITEMS};
use refresh::{Priority, SchedulerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use watcher::WatcherConfig;

/// Overrides the config file location
pub const CONFIG_ENV: &str = "FOLIO_CONFIG";
/// Overrides `store.data_dir`
pub const DATA_DIR_ENV: &str = "FOLIO_DATA_DIR";

/// Every settable key, in display order
pub const KEYS: &[&str] = &[
    "watcher.debounce_ms",
    "watcher.reconcile_interval_secs",
    "refresh.max_concurrency",
    "refresh.priority",
    "store.data_dir",
    "listing.default_max_items",
    "listing.default_sort",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    /// Quiet interval before a changed folder is rebuilt
    pub debounce_ms: u64,
    pub reconcile_interval_secs: u64,
}

impl Default for WatcherSection {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            reconcile_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub max_concurrency: usize,
    pub priority: Priority,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            max_concurrency: refresh::DEFAULT_MAX_CONCURRENCY,
            priority: Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingSection {
    /// Cap for folders without their own settings
    pub default_max_items: usize,
    pub default_sort: SortOrder,
}

impl Default for ListingSection {
    fn default() -> Self {
        Self {
            default_max_items: DEFAULT_MAX_ITEMS,
            default_sort: SortOrder::ModifiedNewest,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub watcher: WatcherSection,
    pub refresh: RefreshSection,
    pub store: StoreSection,
    pub listing: ListingSection,
}

impl SystemConfig {
    /// Check every value is within its accepted range
    pub fn validate(&self) -> folio_core::Result<()> {
        check_range("watcher.debounce_ms", self.watcher.debounce_ms, 50, 60_000)?;
        check_range(
            "watcher.reconcile_interval_secs",
            self.watcher.reconcile_interval_secs,
            1,
            3600,
        )?;
        check_range(
            "refresh.max_concurrency",
            self.refresh.max_concurrency as u64,
            1,
            16,
        )?;
        check_range(
            "listing.default_max_items",
            self.listing.default_max_items as u64,
            1,
            100_000,
        )?;
        Ok(())
    }

    /// Data directory: `FOLIO_DATA_DIR`, then `store.data_dir`, then the platform default
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }
        if let Some(dir) = &self.store.data_dir {
            return Ok(dir.clone());
        }
        let base = dirs::data_dir().context("Could not determine data directory")?;
        Ok(base.join("folio"))
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            quiet_interval: Duration::from_millis(self.watcher.debounce_ms),
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.watcher.reconcile_interval_secs)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrency: self.refresh.max_concurrency,
            priority: self.refresh.priority,
        }
    }

    /// Settings for folders that are neither favorites nor sources
    pub fn listing_defaults(&self) -> FolderSettings {
        FolderSettings::new(self.listing.default_max_items, self.listing.default_sort)
    }

    /// Value of `key` as it would be written on the command line
    pub fn get(&self, key: &str) -> folio_core::Result<String> {
        let value = match key {
            "watcher.debounce_ms" => self.watcher.debounce_ms.to_string(),
            "watcher.reconcile_interval_secs" => self.watcher.reconcile_interval_secs.to_string(),
            "refresh.max_concurrency" => self.refresh.max_concurrency.to_string(),
            "refresh.priority" => priority_name(self.refresh.priority).to_string(),
            "store.data_dir" => self
                .store
                .data_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_default(),
            "listing.default_max_items" => self.listing.default_max_items.to_string(),
            "listing.default_sort" => self.listing.default_sort.to_string(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Parse `value` into `key` and re-validate
    ///
    /// The config is left unchanged when the new value is rejected.
    pub fn set(&mut self, key: &str, value: &str) -> folio_core::Result<()> {
        let mut next = self.clone();
        match key {
            "watcher.debounce_ms" => next.watcher.debounce_ms = parse_number(key, value)?,
            "watcher.reconcile_interval_secs" => {
                next.watcher.reconcile_interval_secs = parse_number(key, value)?
            }
            "refresh.max_concurrency" => next.refresh.max_concurrency = parse_number(key, value)?,
            "refresh.priority" => {
                next.refresh.priority = match value.to_ascii_lowercase().as_str() {
                    "low" => Priority::Low,
                    "normal" => Priority::Normal,
                    _ => {
                        return Err(Error::InvalidConfig(format!(
                            "{key} must be 'low' or 'normal', got '{value}'"
                        )))
                    }
                }
            }
            "store.data_dir" => {
                next.store.data_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "listing.default_max_items" => {
                next.listing.default_max_items = parse_number(key, value)?
            }
            "listing.default_sort" => next.listing.default_sort = value.parse()?,
            _ => return Err(unknown_key(key)),
        }

        next.validate()?;
        *self = next;
        Ok(())
    }
}

/// Location of `folio.toml`
pub fn config_file_path() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(dir.join("folio").join("folio.toml"))
}

/// Load from the default location
pub fn load() -> Result<SystemConfig> {
    load_from(&config_file_path()?)
}

pub fn load_from(path: &Path) -> Result<SystemConfig> {
    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: SystemConfig =
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Save to the default location
pub fn save(config: &SystemConfig) -> Result<()> {
    save_to(&config_file_path()?, config)
}

pub fn save_to(path: &Path, config: &SystemConfig) -> Result<()> {
    config.validate().context("Refusing to save invalid configuration")?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let text = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    store::atomic_write(dir, path, text.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn priority_name(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Normal => "normal",
    }
}

fn check_range(key: &str, value: u64, min: u64, max: u64) -> folio_core::Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{key} must be between {min} and {max}, got {value}"
        )))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> folio_core::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{key} must be a non-negative integer, got '{value}'")))
}

fn unknown_key(key: &str) -> Error {
    Error::InvalidConfig(format!(
        "unknown key '{key}'; run 'folio config list' to see available keys"
    ))
}
