//! Core types for Folio
//!
//! This crate provides:
//! - Listing item records and image classification
//! - Sort orders and the sort-then-truncate policy
//! - Per-folder settings resolution (favorite > dynamic source > default)
//! - Non-recursive directory listing with cancellation checkpoints
//! - Contracts for the external desired-state source, cache store and notifier
//! - An in-memory store implementing those contracts

pub mod cancel;
pub mod error;
pub mod item;
pub mod listing;
pub mod memory;
pub mod settings;
pub mod sort;
pub mod store;

// Re-exports
pub use cancel::CancelFlag;
pub use error::{Error, Result};
pub use item::{is_image_extension, CachedListing, Item, IMAGE_EXTENSIONS};
pub use listing::{count_visible_entries, list_directory};
pub use memory::{MemoryNotifier, MemoryStore};
pub use settings::{resolve_settings, FolderSettings, SettingsSource, DEFAULT_MAX_ITEMS};
pub use sort::{sort_and_truncate, SortOrder};
pub use store::{
    mark_heavy_if_large, CacheStore, ChangeNotifier, DesiredStateSource, DynamicSource,
    FavoriteFolder, RefreshQueue, CACHE_TYPE_HEAVY, CACHE_TYPE_STANDARD,
    FAVORITE_FOLDER_PROVIDER, HEAVY_FOLDER_THRESHOLD,
};
