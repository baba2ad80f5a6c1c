//! Per-folder listing settings

use crate::sort::SortOrder;
use crate::store::DesiredStateSource;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Item cap used when a folder has no registered settings
pub const DEFAULT_MAX_ITEMS: usize = 40;

/// How many items to keep and in which order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSettings {
    pub max_items: usize,
    pub sort_order: SortOrder,
}

impl FolderSettings {
    /// `max_items` is clamped to at least 1
    pub fn new(max_items: usize, sort_order: SortOrder) -> Self {
        Self {
            max_items: max_items.max(1),
            sort_order,
        }
    }
}

impl Default for FolderSettings {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITEMS, SortOrder::ModifiedNewest)
    }
}

/// Where resolved settings came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    Favorite,
    DynamicSource,
    Default,
}

/// Resolve settings for `path`: favorite, then dynamic source, then `defaults`
///
/// A store error on one lookup is logged and resolution moves on to the next.
pub fn resolve_settings(
    source: &dyn DesiredStateSource,
    path: &Path,
    defaults: FolderSettings,
) -> (FolderSettings, SettingsSource) {
    match source.favorite_settings(path) {
        Ok(Some(settings)) => return (settings, SettingsSource::Favorite),
        Ok(None) => {}
        Err(e) => warn!(path = %path.display(), "Favorite settings lookup failed: {}", e),
    }

    match source.dynamic_source_settings(path) {
        Ok(Some(settings)) => return (settings, SettingsSource::DynamicSource),
        Ok(None) => {}
        Err(e) => warn!(path = %path.display(), "Dynamic source settings lookup failed: {}", e),
    }

    (defaults, SettingsSource::Default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_default_settings() {
        let settings = FolderSettings::default();
        assert_eq!(settings.max_items, 40);
        assert_eq!(settings.sort_order, SortOrder::ModifiedNewest);
        assert_eq!(FolderSettings::new(0, SortOrder::NameAsc).max_items, 1);
    }

    #[test]
    fn test_favorite_wins_over_dynamic_source() {
        let store = MemoryStore::new();
        let path = Path::new("/tmp/both");
        store.add_dynamic_source(path, FolderSettings::new(25, SortOrder::SizeDesc));
        store.add_favorite(path, "Both", FolderSettings::new(10, SortOrder::NameAsc));

        let (settings, from) = resolve_settings(&store, path, FolderSettings::default());
        assert_eq!(from, SettingsSource::Favorite);
        assert_eq!(settings.max_items, 10);
        assert_eq!(settings.sort_order, SortOrder::NameAsc);
    }

    #[test]
    fn test_dynamic_source_then_default() {
        let store = MemoryStore::new();
        let dynamic = Path::new("/tmp/dyn");
        store.add_dynamic_source(dynamic, FolderSettings::new(25, SortOrder::SizeDesc));

        let (settings, from) = resolve_settings(&store, dynamic, FolderSettings::default());
        assert_eq!(from, SettingsSource::DynamicSource);
        assert_eq!(settings.sort_order, SortOrder::SizeDesc);

        let (settings, from) = resolve_settings(&store, Path::new("/tmp/other"), FolderSettings::default());
        assert_eq!(from, SettingsSource::Default);
        assert_eq!(settings, FolderSettings::default());
    }
}
