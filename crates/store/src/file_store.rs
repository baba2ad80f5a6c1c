//! File-backed desired-state source and listing cache

use crate::atomic::atomic_write;
use crate::document::FoldersDocument;
use chrono::Utc;
use folio_core::{
    count_visible_entries, mark_heavy_if_large, CacheStore, CachedListing, DesiredStateSource,
    DynamicSource, Error, FavoriteFolder, FolderSettings, Item, Result, CACHE_TYPE_HEAVY,
};
use parking_lot::{Mutex, RwLock};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

const FOLDERS_FILE: &str = "folders.toml";
const LISTINGS_DIR: &str = "listings";
const LOGS_DIR: &str = "logs";
const TMP_DIR: &str = "tmp";
const LOCK_FILE: &str = "daemon.lock";

/// Identity of the on-disk folders file when it was last parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
    /// Atomic replacement swaps the inode even when mtime and length match
    inode: u64,
}

#[derive(Default)]
struct CachedDocument {
    doc: FoldersDocument,
    stamp: Option<FileStamp>,
}

/// Folio data directory
///
/// Manages the directory structure:
/// ```text
/// <data_dir>/
///   folders.toml
///   daemon.lock
///   listings/
///     <hh>/<rest>.json
///   logs/
///   tmp/
/// ```
/// Every write is atomic, so a daemon and one-shot commands can share one
/// data directory.
pub struct FileStore {
    root: PathBuf,
    /// Parsed folders document, refreshed when the file changes on disk
    cached: RwLock<CachedDocument>,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the data directory at `root`, creating it if needed
    pub fn open(root: &Path) -> Result<Self> {
        for dir in [root.to_path_buf(), root.join(LISTINGS_DIR), root.join(TMP_DIR)] {
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }

        let store = Self {
            root: root.to_path_buf(),
            cached: RwLock::new(CachedDocument::default()),
            write_lock: Mutex::new(()),
        };
        store.document()?;
        debug!(root = %root.display(), "Opened file store");
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folders_path(&self) -> PathBuf {
        self.root.join(FOLDERS_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LOGS_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    /// Listing file for `path`: listings/<hh>/<rest>.json, keyed by BLAKE3 of the path
    pub fn listing_path(&self, path: &Path) -> PathBuf {
        let hash = blake3::hash(path.to_string_lossy().as_bytes());
        let hex = hash.to_hex();
        let (prefix, rest) = hex.as_str().split_at(2);
        self.root
            .join(LISTINGS_DIR)
            .join(prefix)
            .join(format!("{rest}.json"))
    }

    /// Current folders document, re-read if the file changed since last parse
    pub fn document(&self) -> Result<FoldersDocument> {
        let path = self.folders_path();
        let stamp = file_stamp(&path)?;

        {
            let cached = self.cached.read();
            if stamp.is_some() && cached.stamp == stamp {
                return Ok(cached.doc.clone());
            }
        }

        let doc = read_document(&path)?;
        let mut cached = self.cached.write();
        cached.doc = doc.clone();
        cached.stamp = stamp;
        Ok(doc)
    }

    /// Read-modify-write the folders document
    ///
    /// Always starts from the file on disk, so edits made by another
    /// process since the last read are kept.
    fn update<T>(&self, edit: impl FnOnce(&mut FoldersDocument) -> T) -> Result<T> {
        let _guard = self.write_lock.lock();
        let path = self.folders_path();

        let mut doc = read_document(&path)?;
        let result = edit(&mut doc);

        let text = toml::to_string_pretty(&doc).map_err(|e| Error::Serialization(e.to_string()))?;
        atomic_write(&self.tmp_dir(), &path, text.as_bytes())?;

        let mut cached = self.cached.write();
        cached.doc = doc;
        cached.stamp = file_stamp(&path)?;
        Ok(result)
    }

    /// Register `path` as a favorite, or update its name and settings
    ///
    /// The display name defaults to the folder's last path component.
    /// Returns true if the favorite is new.
    pub fn add_favorite(
        &self,
        path: &Path,
        display_name: Option<&str>,
        settings: FolderSettings,
    ) -> Result<bool> {
        let name = match display_name {
            Some(name) => name.to_string(),
            None => default_display_name(path),
        };
        let added = self.update(|doc| doc.upsert_favorite(path, &name, settings))?;
        info!(path = %path.display(), name = %name, added, "Favorite saved");
        Ok(added)
    }

    pub fn remove_favorite(&self, path: &Path) -> Result<bool> {
        let removed = self.update(|doc| doc.remove_favorite(path))?;
        if removed {
            info!(path = %path.display(), "Favorite removed");
            self.prune_listing(path)?;
        }
        Ok(removed)
    }

    /// Register `path` as a dynamic source, or update its settings
    ///
    /// Counts the folder's visible entries and marks it heavy past the
    /// threshold. Returns true if the source is new.
    pub fn add_dynamic_source(&self, path: &Path, settings: FolderSettings) -> Result<bool> {
        let added = self.update(|doc| doc.upsert_dynamic_source(path, settings))?;
        info!(path = %path.display(), added, "Dynamic source saved");

        if path.is_dir() {
            mark_heavy_if_large(self, path, count_visible_entries(path))?;
        } else {
            warn!(path = %path.display(), "Dynamic source is not a readable directory yet");
        }
        Ok(added)
    }

    pub fn remove_dynamic_source(&self, path: &Path) -> Result<bool> {
        let removed = self.update(|doc| doc.remove_dynamic_source(path))?;
        if removed {
            info!(path = %path.display(), "Dynamic source removed");
            self.prune_listing(path)?;
        }
        Ok(removed)
    }

    /// Cached listing for `path`, if one was ever saved
    pub fn load_listing(&self, path: &Path) -> Result<Option<CachedListing>> {
        let file = self.listing_path(path);
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::io(&file, e)),
        };
        let listing = serde_json::from_slice(&bytes).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Some(listing))
    }

    /// Delete the cached listing once `path` is neither favorite nor source
    fn prune_listing(&self, path: &Path) -> Result<()> {
        if self.document()?.is_registered(path) {
            return Ok(());
        }
        let file = self.listing_path(path);
        match fs::remove_file(&file) {
            Ok(()) => {
                debug!(path = %path.display(), "Cached listing pruned");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&file, e)),
        }
    }
}

impl DesiredStateSource for FileStore {
    fn list_favorite_folders(&self) -> Result<Vec<FavoriteFolder>> {
        Ok(self.document()?.favorite_folders())
    }

    fn list_dynamic_source_folders(&self) -> Result<Vec<DynamicSource>> {
        Ok(self.document()?.dynamic_source_folders())
    }

    fn favorite_settings(&self, path: &Path) -> Result<Option<FolderSettings>> {
        Ok(self.document()?.favorite(path).map(|f| f.settings))
    }

    fn dynamic_source_settings(&self, path: &Path) -> Result<Option<FolderSettings>> {
        Ok(self.document()?.dynamic_source(path).map(|s| s.settings))
    }

    fn is_heavy_folder(&self, path: &Path) -> Result<bool> {
        Ok(self.document()?.is_heavy(path))
    }

    fn mark_as_heavy_folder(&self, path: &Path, item_count: usize) -> Result<()> {
        self.update(|doc| doc.mark_heavy(path, item_count))
    }
}

impl CacheStore for FileStore {
    fn save_listing(&self, path: &Path, items: &[Item], cache_type: &str) -> Result<()> {
        let listing = CachedListing {
            path: path.to_path_buf(),
            cache_type: cache_type.to_string(),
            saved_at: Utc::now(),
            items: items.to_vec(),
        };
        let data = serde_json::to_vec(&listing).map_err(|e| Error::Serialization(e.to_string()))?;
        atomic_write(&self.tmp_dir(), &self.listing_path(path), &data)
    }

    fn cache_type(&self, path: &Path) -> Result<Option<String>> {
        Ok(self
            .document()?
            .is_heavy(path)
            .then(|| CACHE_TYPE_HEAVY.to_string()))
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore").field("root", &self.root).finish()
    }
}

fn default_display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_stamp(path: &Path) -> Result<Option<FileStamp>> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(FileStamp {
            modified: meta.modified().map_err(|e| Error::io(path, e))?,
            len: meta.len(),
            inode: inode(&meta),
        })),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(unix)]
fn inode(meta: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode(_meta: &fs::Metadata) -> u64 {
    0
}

fn read_document(path: &Path) -> Result<FoldersDocument> {
    match fs::read_to_string(path) {
        Ok(text) => toml::from_str(&text)
            .map_err(|e| Error::Store(format!("{} is not valid: {}", path.display(), e))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(FoldersDocument::default()),
        Err(e) => Err(Error::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{SortOrder, CACHE_TYPE_STANDARD, HEAVY_FOLDER_THRESHOLD};
    use tempfile::TempDir;

    fn open() -> (TempDir, FileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::open(&temp_dir.path().join("data")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_favorites_persist_across_instances() {
        let (temp_dir, store) = open();
        let settings = FolderSettings::new(10, SortOrder::NameAsc);
        assert!(store.add_favorite(Path::new("/photos"), Some("Photos"), settings).unwrap());
        assert!(store.add_favorite(Path::new("/music"), None, FolderSettings::default()).unwrap());

        let reopened = FileStore::open(&temp_dir.path().join("data")).unwrap();
        let favorites = reopened.list_favorite_folders().unwrap();
        assert_eq!(favorites.len(), 2);
        assert_eq!(favorites[0].display_name, "Photos");
        assert_eq!(favorites[1].display_name, "music");
        assert_eq!(reopened.favorite_settings(Path::new("/photos")).unwrap(), Some(settings));
    }

    #[test]
    fn test_external_edit_is_picked_up() {
        let (temp_dir, store) = open();
        store.add_favorite(Path::new("/a"), None, FolderSettings::default()).unwrap();
        assert_eq!(store.list_favorite_folders().unwrap().len(), 1);

        // Another process rewrites the file
        let other = FileStore::open(&temp_dir.path().join("data")).unwrap();
        other.add_favorite(Path::new("/b"), None, FolderSettings::default()).unwrap();
        other.add_dynamic_source(Path::new("/c"), FolderSettings::default()).unwrap();

        assert_eq!(store.list_favorite_folders().unwrap().len(), 2);
        assert_eq!(store.list_dynamic_source_folders().unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_same_size_replacement_within_one_tick_is_picked_up() {
        use filetime::{set_file_mtime, FileTime};

        let (temp_dir, store) = open();
        store.add_favorite(Path::new("/aa"), None, FolderSettings::default()).unwrap();
        let folders = store.folders_path();
        let original = fs::read_to_string(&folders).unwrap();
        let mtime = FileTime::from_last_modification_time(&fs::metadata(&folders).unwrap());
        assert_eq!(store.list_favorite_folders().unwrap()[0].path, Path::new("/aa"));

        // Same length, same mtime, new inode
        let replacement = temp_dir.path().join("replacement.toml");
        fs::write(&replacement, original.replace("/aa", "/bb")).unwrap();
        set_file_mtime(&replacement, mtime).unwrap();
        fs::rename(&replacement, &folders).unwrap();

        assert_eq!(store.list_favorite_folders().unwrap()[0].path, Path::new("/bb"));
    }

    #[test]
    fn test_large_dynamic_source_is_marked_heavy() {
        let (temp_dir, store) = open();
        let big = temp_dir.path().join("big");
        let small = temp_dir.path().join("small");
        fs::create_dir(&big).unwrap();
        fs::create_dir(&small).unwrap();
        for i in 0..=HEAVY_FOLDER_THRESHOLD {
            fs::write(big.join(format!("{i}.txt")), b"").unwrap();
        }
        fs::write(small.join("one.txt"), b"").unwrap();

        store.add_dynamic_source(&big, FolderSettings::default()).unwrap();
        store.add_dynamic_source(&small, FolderSettings::default()).unwrap();

        assert!(store.is_heavy_folder(&big).unwrap());
        assert!(!store.is_heavy_folder(&small).unwrap());
        assert_eq!(store.cache_type(&big).unwrap().as_deref(), Some(CACHE_TYPE_HEAVY));
        assert_eq!(store.cache_type(&small).unwrap(), None);
        assert_eq!(
            store.document().unwrap().heavy_mark(&big).unwrap().item_count,
            HEAVY_FOLDER_THRESHOLD + 1
        );
    }

    #[test]
    fn test_missing_dynamic_source_still_registers() {
        let (temp_dir, store) = open();
        let gone = temp_dir.path().join("gone");
        assert!(store.add_dynamic_source(&gone, FolderSettings::default()).unwrap());
        assert!(!store.is_heavy_folder(&gone).unwrap());
    }

    #[test]
    fn test_listing_roundtrip_and_layout() {
        let (_temp_dir, store) = open();
        let path = Path::new("/photos");
        let item = Item::new(Path::new("/photos/a.jpg"), false, 12, Utc::now());

        assert!(store.load_listing(path).unwrap().is_none());
        store.save_listing(path, &[item.clone()], CACHE_TYPE_STANDARD).unwrap();

        let listing = store.load_listing(path).unwrap().unwrap();
        assert_eq!(listing.items, vec![item]);
        assert_eq!(listing.cache_type, CACHE_TYPE_STANDARD);

        let file = store.listing_path(path);
        assert!(file.starts_with(store.root().join("listings")));
        assert_eq!(file.parent().unwrap().file_name().unwrap().len(), 2);
        assert_ne!(store.listing_path(Path::new("/other")), file);
    }

    #[test]
    fn test_removal_prunes_listing_only_when_unregistered() {
        let (_temp_dir, store) = open();
        let path = Path::new("/both");
        store.add_favorite(path, None, FolderSettings::default()).unwrap();
        store.add_dynamic_source(path, FolderSettings::default()).unwrap();
        store.save_listing(path, &[], CACHE_TYPE_STANDARD).unwrap();

        assert!(store.remove_favorite(path).unwrap());
        assert!(store.load_listing(path).unwrap().is_some());

        assert!(store.remove_dynamic_source(path).unwrap());
        assert!(store.load_listing(path).unwrap().is_none());
        assert!(!store.remove_dynamic_source(path).unwrap());
    }

    #[test]
    fn test_corrupt_document_is_a_store_error() {
        let (_temp_dir, store) = open();
        fs::write(store.folders_path(), "favorites = 7").unwrap();
        assert!(matches!(store.list_favorite_folders(), Err(Error::Store(_))));
    }
}
