//! File-backed store for Folio
//!
//! This crate provides:
//! - `FileStore`: favorites, dynamic sources and heavy marks in `folders.toml`
//! - One JSON listing per watched folder, keyed by BLAKE3 of its path
//! - Atomic writes, so a daemon and one-shot commands can share a data directory

pub mod atomic;
pub mod document;
pub mod file_store;

pub use atomic::atomic_write;
pub use document::{FavoriteEntry, FoldersDocument, HeavyMark, SourceEntry};
pub use file_store::FileStore;
