//! In-memory store and notifier
//!
//! Non-persistent implementations of the store contracts, for embedding
//! without a data directory and for exercising the watch/refresh pipeline.

use crate::error::{Error, Result};
use crate::item::{CachedListing, Item};
use crate::settings::FolderSettings;
use crate::store::{
    CacheStore, ChangeNotifier, DesiredStateSource, DynamicSource, FavoriteFolder, CACHE_TYPE_HEAVY,
};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Default)]
struct MemoryState {
    favorites: BTreeMap<PathBuf, (String, FolderSettings)>,
    dynamic_sources: BTreeMap<PathBuf, FolderSettings>,
    heavy: BTreeMap<PathBuf, usize>,
    cache_types: BTreeMap<PathBuf, String>,
    saves: Vec<CachedListing>,
    fail_saves: bool,
}

/// Desired-state source and cache store held in memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_favorite(&self, path: &Path, display_name: &str, settings: FolderSettings) {
        self.state
            .lock()
            .favorites
            .insert(path.to_path_buf(), (display_name.to_string(), settings));
    }

    pub fn remove_favorite(&self, path: &Path) -> bool {
        self.state.lock().favorites.remove(path).is_some()
    }

    pub fn add_dynamic_source(&self, path: &Path, settings: FolderSettings) {
        self.state
            .lock()
            .dynamic_sources
            .insert(path.to_path_buf(), settings);
    }

    pub fn remove_dynamic_source(&self, path: &Path) -> bool {
        self.state.lock().dynamic_sources.remove(path).is_some()
    }

    pub fn set_cache_type(&self, path: &Path, cache_type: &str) {
        self.state
            .lock()
            .cache_types
            .insert(path.to_path_buf(), cache_type.to_string());
    }

    /// Item count recorded when `path` was marked heavy
    pub fn heavy_item_count(&self, path: &Path) -> Option<usize> {
        self.state.lock().heavy.get(path).copied()
    }

    /// Make every subsequent `save_listing` fail
    pub fn fail_saves(&self, fail: bool) {
        self.state.lock().fail_saves = fail;
    }

    /// Every listing saved so far, oldest first
    pub fn saved_listings(&self) -> Vec<CachedListing> {
        self.state.lock().saves.clone()
    }

    pub fn save_count(&self, path: &Path) -> usize {
        self.state
            .lock()
            .saves
            .iter()
            .filter(|listing| listing.path == path)
            .count()
    }

    pub fn last_listing(&self, path: &Path) -> Option<CachedListing> {
        self.state
            .lock()
            .saves
            .iter()
            .rev()
            .find(|listing| listing.path == path)
            .cloned()
    }
}

impl DesiredStateSource for MemoryStore {
    fn list_favorite_folders(&self) -> Result<Vec<FavoriteFolder>> {
        let state = self.state.lock();
        Ok(state
            .favorites
            .iter()
            .map(|(path, (display_name, settings))| FavoriteFolder {
                path: path.clone(),
                display_name: display_name.clone(),
                is_heavy: state.heavy.contains_key(path),
                settings: *settings,
            })
            .collect())
    }

    fn list_dynamic_source_folders(&self) -> Result<Vec<DynamicSource>> {
        Ok(self
            .state
            .lock()
            .dynamic_sources
            .iter()
            .map(|(path, settings)| DynamicSource {
                path: path.clone(),
                settings: *settings,
            })
            .collect())
    }

    fn favorite_settings(&self, path: &Path) -> Result<Option<FolderSettings>> {
        Ok(self.state.lock().favorites.get(path).map(|(_, settings)| *settings))
    }

    fn dynamic_source_settings(&self, path: &Path) -> Result<Option<FolderSettings>> {
        Ok(self.state.lock().dynamic_sources.get(path).copied())
    }

    fn is_heavy_folder(&self, path: &Path) -> Result<bool> {
        Ok(self.state.lock().heavy.contains_key(path))
    }

    fn mark_as_heavy_folder(&self, path: &Path, item_count: usize) -> Result<()> {
        let mut state = self.state.lock();
        state.heavy.insert(path.to_path_buf(), item_count);
        state
            .cache_types
            .insert(path.to_path_buf(), CACHE_TYPE_HEAVY.to_string());
        Ok(())
    }
}

impl CacheStore for MemoryStore {
    fn save_listing(&self, path: &Path, items: &[Item], cache_type: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_saves {
            return Err(Error::Store(format!("save rejected for {}", path.display())));
        }

        state.saves.push(CachedListing {
            path: path.to_path_buf(),
            cache_type: cache_type.to_string(),
            saved_at: Utc::now(),
            items: items.to_vec(),
        });
        Ok(())
    }

    fn cache_type(&self, path: &Path) -> Result<Option<String>> {
        Ok(self.state.lock().cache_types.get(path).cloned())
    }
}

/// Notifier that records every notification
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<(String, PathBuf)>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<(String, PathBuf)> {
        self.sent.lock().clone()
    }

    pub fn count_for(&self, path: &Path) -> usize {
        self.sent.lock().iter().filter(|(_, p)| p == path).count()
    }
}

impl ChangeNotifier for MemoryNotifier {
    fn notify(&self, provider_id: &str, path: &Path) {
        self.sent
            .lock()
            .push((provider_id.to_string(), path.to_path_buf()));
    }
}
