//! Error types shared across the folio crates

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by folio components
#[derive(Debug, Error)]
pub enum Error {
    /// Path does not exist
    #[error("path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Filesystem I/O failure
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to open a change subscription
    #[error("failed to subscribe to {}: {message}", path.display())]
    Subscription { path: PathBuf, message: String },

    /// Backing store failure
    #[error("store error: {0}")]
    Store(String),

    /// Encoding or decoding of a persisted document failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Work was cancelled before it could commit
    #[error("operation cancelled")]
    Cancelled,

    /// Unknown sort order name
    #[error("unknown sort order '{0}'")]
    InvalidSortOrder(String),

    /// Configuration value out of range or malformed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap an I/O error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for folio operations
pub type Result<T> = std::result::Result<T, Error>;
