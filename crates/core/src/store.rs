//! Contracts for the collaborators around the watch/refresh core

use crate::error::Result;
use crate::item::Item;
use crate::settings::FolderSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Folders with more visible entries than this are "heavy"
pub const HEAVY_FOLDER_THRESHOLD: usize = 100;

/// Cache type recorded for heavy folders
pub const CACHE_TYPE_HEAVY: &str = "heavy";

/// Cache type recorded when the store has no classification for a path
pub const CACHE_TYPE_STANDARD: &str = "standard";

/// Provider identifier sent with every listing change notification
pub const FAVORITE_FOLDER_PROVIDER: &str = "favorite-folder";

/// A folder the user marked as a favorite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteFolder {
    pub path: PathBuf,
    pub display_name: String,
    pub is_heavy: bool,
    pub settings: FolderSettings,
}

/// A folder backing a dynamically generated file list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicSource {
    pub path: PathBuf,
    pub settings: FolderSettings,
}

/// Source of truth for which folders should be watched
pub trait DesiredStateSource: Send + Sync {
    fn list_favorite_folders(&self) -> Result<Vec<FavoriteFolder>>;

    fn list_dynamic_source_folders(&self) -> Result<Vec<DynamicSource>>;

    /// Settings if `path` is a favorite
    fn favorite_settings(&self, path: &Path) -> Result<Option<FolderSettings>>;

    /// Settings if `path` backs a dynamic file list
    fn dynamic_source_settings(&self, path: &Path) -> Result<Option<FolderSettings>>;

    fn is_heavy_folder(&self, path: &Path) -> Result<bool>;

    fn mark_as_heavy_folder(&self, path: &Path, item_count: usize) -> Result<()>;
}

/// Write side of the listing cache
pub trait CacheStore: Send + Sync {
    /// Replace the cached listing for `path`
    fn save_listing(&self, path: &Path, items: &[Item], cache_type: &str) -> Result<()>;

    /// Classification the store associates with `path`, if any
    fn cache_type(&self, path: &Path) -> Result<Option<String>>;
}

/// Publish side of the listing-changed channel
pub trait ChangeNotifier: Send + Sync {
    fn notify(&self, provider_id: &str, path: &Path);
}

/// Enqueue side of the refresh scheduler, as seen by the watch controller
pub trait RefreshQueue: Send + Sync {
    /// Request a rebuild. Returns false if one is already queued or running.
    fn enqueue(&self, path: &Path, display_name: &str) -> bool;

    /// Drop a rebuild that has not started yet. Returns true if one was dropped.
    fn cancel_pending(&self, path: &Path) -> bool;
}

/// Mark `path` heavy if it has crossed the threshold and is not marked yet
///
/// Returns true when the folder was newly marked.
pub fn mark_heavy_if_large(
    source: &dyn DesiredStateSource,
    path: &Path,
    item_count: usize,
) -> Result<bool> {
    if item_count <= HEAVY_FOLDER_THRESHOLD || source.is_heavy_folder(path)? {
        return Ok(false);
    }

    source.mark_as_heavy_folder(path, item_count)?;
    info!(path = %path.display(), item_count, "Marked folder as heavy");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_threshold_is_exclusive() {
        let store = MemoryStore::new();
        let path = Path::new("/tmp/d");

        assert!(!mark_heavy_if_large(&store, path, HEAVY_FOLDER_THRESHOLD).unwrap());
        assert!(!store.is_heavy_folder(path).unwrap());

        assert!(mark_heavy_if_large(&store, path, HEAVY_FOLDER_THRESHOLD + 1).unwrap());
        assert!(store.is_heavy_folder(path).unwrap());
    }

    #[test]
    fn test_already_heavy_is_not_remarked() {
        let store = MemoryStore::new();
        let path = Path::new("/tmp/d");
        store.mark_as_heavy_folder(path, 500).unwrap();

        assert!(!mark_heavy_if_large(&store, path, 900).unwrap());
        assert_eq!(store.heavy_item_count(path), Some(500));
    }
}
