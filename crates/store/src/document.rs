//! `folders.toml`: favorites, dynamic sources, heavy marks

use chrono::{DateTime, Utc};
use folio_core::{DynamicSource, FavoriteFolder, FolderSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A favorite as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub path: PathBuf,
    pub display_name: String,
    pub settings: FolderSettings,
    pub added_at: DateTime<Utc>,
}

/// A dynamic source as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub settings: FolderSettings,
    pub added_at: DateTime<Utc>,
}

/// Record of a folder crossing the heavy threshold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeavyMark {
    pub path: PathBuf,
    pub item_count: usize,
    pub marked_at: DateTime<Utc>,
}

/// Parsed `folders.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersDocument {
    pub favorites: Vec<FavoriteEntry>,
    pub dynamic_sources: Vec<SourceEntry>,
    pub heavy: Vec<HeavyMark>,
}

impl FoldersDocument {
    pub fn favorite(&self, path: &Path) -> Option<&FavoriteEntry> {
        self.favorites.iter().find(|f| f.path == path)
    }

    pub fn dynamic_source(&self, path: &Path) -> Option<&SourceEntry> {
        self.dynamic_sources.iter().find(|s| s.path == path)
    }

    pub fn heavy_mark(&self, path: &Path) -> Option<&HeavyMark> {
        self.heavy.iter().find(|h| h.path == path)
    }

    pub fn is_heavy(&self, path: &Path) -> bool {
        self.heavy_mark(path).is_some()
    }

    /// Insert or update a favorite. Returns true if it was new.
    pub fn upsert_favorite(&mut self, path: &Path, display_name: &str, settings: FolderSettings) -> bool {
        if let Some(existing) = self.favorites.iter_mut().find(|f| f.path == path) {
            existing.display_name = display_name.to_string();
            existing.settings = settings;
            return false;
        }
        self.favorites.push(FavoriteEntry {
            path: path.to_path_buf(),
            display_name: display_name.to_string(),
            settings,
            added_at: Utc::now(),
        });
        true
    }

    /// Insert or update a dynamic source. Returns true if it was new.
    pub fn upsert_dynamic_source(&mut self, path: &Path, settings: FolderSettings) -> bool {
        if let Some(existing) = self.dynamic_sources.iter_mut().find(|s| s.path == path) {
            existing.settings = settings;
            return false;
        }
        self.dynamic_sources.push(SourceEntry {
            path: path.to_path_buf(),
            settings,
            added_at: Utc::now(),
        });
        true
    }

    pub fn remove_favorite(&mut self, path: &Path) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|f| f.path != path);
        self.favorites.len() != before
    }

    pub fn remove_dynamic_source(&mut self, path: &Path) -> bool {
        let before = self.dynamic_sources.len();
        self.dynamic_sources.retain(|s| s.path != path);
        self.dynamic_sources.len() != before
    }

    /// Record a heavy mark; an existing mark keeps its original count
    pub fn mark_heavy(&mut self, path: &Path, item_count: usize) {
        if self.is_heavy(path) {
            return;
        }
        self.heavy.push(HeavyMark {
            path: path.to_path_buf(),
            item_count,
            marked_at: Utc::now(),
        });
    }

    /// Whether `path` is still a favorite or a dynamic source
    pub fn is_registered(&self, path: &Path) -> bool {
        self.favorite(path).is_some() || self.dynamic_source(path).is_some()
    }

    pub fn favorite_folders(&self) -> Vec<FavoriteFolder> {
        self.favorites
            .iter()
            .map(|f| FavoriteFolder {
                path: f.path.clone(),
                display_name: f.display_name.clone(),
                is_heavy: self.is_heavy(&f.path),
                settings: f.settings,
            })
            .collect()
    }

    pub fn dynamic_source_folders(&self) -> Vec<DynamicSource> {
        self.dynamic_sources
            .iter()
            .map(|s| DynamicSource {
                path: s.path.clone(),
                settings: s.settings,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::SortOrder;

    #[test]
    fn test_document_toml_shape() {
        let mut doc = FoldersDocument::default();
        doc.upsert_favorite(Path::new("/photos"), "Photos", FolderSettings::new(10, SortOrder::NameAsc));
        doc.upsert_dynamic_source(Path::new("/downloads"), FolderSettings::default());
        doc.mark_heavy(Path::new("/downloads"), 250);

        let text = toml::to_string_pretty(&doc).unwrap();
        assert!(text.contains("[[favorites]]"));
        assert!(text.contains("sort_order = \"name-asc\""));
        assert!(text.contains("[[heavy]]"));

        let parsed: FoldersDocument = toml::from_str(&text).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let parsed: FoldersDocument = toml::from_str("").unwrap();
        assert!(parsed.favorites.is_empty());
        assert!(parsed.heavy.is_empty());
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut doc = FoldersDocument::default();
        assert!(doc.upsert_favorite(Path::new("/a"), "A", FolderSettings::default()));
        assert!(!doc.upsert_favorite(Path::new("/a"), "Renamed", FolderSettings::new(5, SortOrder::SizeAsc)));

        assert_eq!(doc.favorites.len(), 1);
        assert_eq!(doc.favorites[0].display_name, "Renamed");
        assert_eq!(doc.favorites[0].settings.max_items, 5);
    }

    #[test]
    fn test_heavy_mark_keeps_first_count() {
        let mut doc = FoldersDocument::default();
        doc.mark_heavy(Path::new("/a"), 150);
        doc.mark_heavy(Path::new("/a"), 900);
        assert_eq!(doc.heavy_mark(Path::new("/a")).unwrap().item_count, 150);
        assert!(doc.favorite_folders().is_empty());
    }
}
