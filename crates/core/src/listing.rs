//! Non-recursive directory listing

use crate::cancel::CancelFlag;
use crate::error::Result;
use crate::item::Item;
use chrono::{DateTime, Utc};
use std::fs::Metadata;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// List the visible direct children of `dir`
///
/// An unreadable or vanished directory yields an empty list. The only error
/// is `Error::Cancelled`, checked before every per-item metadata fetch.
pub fn list_directory(dir: &Path, cancel: &CancelFlag) -> Result<Vec<Item>> {
    let mut items = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                warn!(path = %dir.display(), "Directory unreadable, treating as empty: {}", e);
                return Ok(Vec::new());
            }
            Err(e) => {
                debug!(path = %dir.display(), "Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if is_hidden(entry.file_name()) {
            continue;
        }

        cancel.check()?;

        // Follow symlinks for the item's own metadata; fall back to the link itself
        let metadata = match std::fs::metadata(entry.path()).or_else(|_| std::fs::symlink_metadata(entry.path())) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(path = %entry.path().display(), "Entry vanished during listing: {}", e);
                continue;
            }
        };

        items.push(item_from_metadata(entry.path(), &metadata));
    }

    Ok(items)
}

/// Count the visible direct children of `dir` (0 if unreadable)
pub fn count_visible_entries(dir: &Path) -> usize {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| !is_hidden(entry.file_name()))
        .count()
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn item_from_metadata(path: &Path, metadata: &Metadata) -> Item {
    let modified = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    let is_directory = metadata.is_dir();
    let size = if is_directory { 0 } else { metadata.len() };

    let mut item = Item::new(path, is_directory, size, modified);
    item.created = metadata.created().map(DateTime::<Utc>::from).unwrap_or(modified);
    item.added = added_time(metadata).unwrap_or(item.created);
    item
}

/// Time the entry was placed in its directory
///
/// Unix has no "date added" attribute; the inode change time moves when an
/// entry is created, renamed or moved in, which is the closest equivalent.
#[cfg(unix)]
fn added_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    use std::os::unix::fs::MetadataExt;
    DateTime::<Utc>::from_timestamp(metadata.ctime(), metadata.ctime_nsec() as u32)
}

#[cfg(not(unix))]
fn added_time(_metadata: &Metadata) -> Option<DateTime<Utc>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_lists_direct_children_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("a.txt"), b"hello").unwrap();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("sub/nested.txt"), b"x").unwrap();

        let mut items = list_directory(root, &CancelFlag::new()).unwrap();
        items.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "a.txt");
        assert_eq!(items[0].size, 5);
        assert_eq!(items[0].extension, "txt");
        assert!(!items[0].is_directory);
        assert_eq!(items[1].name, "sub");
        assert!(items[1].is_directory);
        assert_eq!(items[1].size, 0);
    }

    #[test]
    fn test_hidden_entries_excluded() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();
        fs::write(temp_dir.path().join("visible"), b"").unwrap();

        let items = list_directory(temp_dir.path(), &CancelFlag::new()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "visible");
        assert_eq!(count_visible_entries(temp_dir.path()), 1);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let gone = temp_dir.path().join("gone");

        let items = list_directory(&gone, &CancelFlag::new()).unwrap();
        assert!(items.is_empty());
        assert_eq!(count_visible_entries(&gone), 0);
    }

    #[test]
    fn test_cancelled_listing_aborts() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a"), b"").unwrap();

        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(matches!(list_directory(temp_dir.path(), &cancel), Err(Error::Cancelled)));
    }

    #[test]
    fn test_modification_time_captured() {
        use filetime::{set_file_mtime, FileTime};

        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("old.txt");
        fs::write(&file, b"old").unwrap();
        set_file_mtime(&file, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();

        let items = list_directory(temp_dir.path(), &CancelFlag::new()).unwrap();
        assert_eq!(items[0].modified.timestamp(), 1_000_000_000);
    }
}
