//! Listing item records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions classified as images (compared case-insensitively)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "tiff", "heic", "webp"];

/// One direct child of a watched directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// File name (last path component)
    pub name: String,
    /// Absolute path
    pub path: PathBuf,
    pub is_directory: bool,
    pub modified: DateTime<Utc>,
    pub created: DateTime<Utc>,
    /// When the entry was added to its folder
    pub added: DateTime<Utc>,
    /// Extension without the leading dot, as it appears on disk
    pub extension: String,
    /// Size in bytes (0 for directories)
    pub size: u64,
    pub is_image: bool,
}

impl Item {
    /// Build an item for `path`, all timestamps set to `modified`
    pub fn new(path: &Path, is_directory: bool, size: u64, modified: DateTime<Utc>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = if is_directory {
            String::new()
        } else {
            path.extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        Self {
            name,
            path: path.to_path_buf(),
            is_directory,
            modified,
            created: modified,
            added: modified,
            extension,
            size,
            is_image: false,
        }
    }

    /// Set `is_image` from the extension allow-list
    pub fn classify(&mut self) {
        self.is_image = !self.is_directory && is_image_extension(&self.extension);
    }
}

/// Whether `ext` (no leading dot) names an image format
pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(ext))
}

/// A persisted, ordered listing for one directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedListing {
    pub path: PathBuf,
    pub cache_type: String,
    pub saved_at: DateTime<Utc>,
    pub items: Vec<Item>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions_case_insensitive() {
        assert!(is_image_extension("jpg"));
        assert!(is_image_extension("JPEG"));
        assert!(is_image_extension("HeIc"));
        assert!(is_image_extension("webp"));
        assert!(!is_image_extension("pdf"));
        assert!(!is_image_extension(""));
        assert!(!is_image_extension("jpgx"));
    }

    #[test]
    fn test_item_fields_from_path() {
        let mut item = Item::new(Path::new("/tmp/d/Photo.PNG"), false, 12, Utc::now());
        assert_eq!(item.name, "Photo.PNG");
        assert_eq!(item.extension, "PNG");
        assert!(!item.is_image);

        item.classify();
        assert!(item.is_image);
    }

    #[test]
    fn test_directories_are_never_images() {
        let mut item = Item::new(Path::new("/tmp/d/album.png"), true, 0, Utc::now());
        item.classify();
        assert_eq!(item.extension, "");
        assert!(!item.is_image);
    }
}
