//! One OS change subscription for one directory

use crate::ChangeKind;
use folio_core::{Error, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Non-recursive change subscription for a single directory
///
/// Every notify callback carrying at least one create/remove/modify/rename
/// event produces exactly one call to `on_change` with the watched path.
/// After `stop` (or drop) no further callbacks are delivered.
pub struct DirectorySubscriber {
    path: PathBuf,
    /// Cleared before the OS handle is released so in-flight callbacks become no-ops
    alive: Arc<AtomicBool>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl DirectorySubscriber {
    /// Open a subscription on `path`, which must be an existing directory
    pub fn open<F>(path: &Path, on_change: F) -> Result<Self>
    where
        F: Fn(&Path) + Send + Sync + 'static,
    {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::io(path, e),
        })?;
        if !metadata.is_dir() {
            return Err(Error::NotADirectory(path.to_path_buf()));
        }

        let alive = Arc::new(AtomicBool::new(true));
        let callback_alive = Arc::clone(&alive);
        let watched = path.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if !callback_alive.load(Ordering::SeqCst) {
                return;
            }
            match res {
                Ok(event) => {
                    if let Some(kind) = ChangeKind::from_notify(&event.kind) {
                        trace!(path = %watched.display(), ?kind, "Directory changed");
                        on_change(&watched);
                    }
                }
                Err(e) => debug!(path = %watched.display(), "Watch error: {}", e),
            }
        })
        .map_err(|e| subscription_error(path, e))?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| subscription_error(path, e))?;

        debug!(path = %path.display(), "Subscription opened");

        Ok(Self {
            path: path.to_path_buf(),
            alive,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Release the OS subscription. Safe to call any number of times.
    pub fn stop(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(mut watcher) = self.watcher.lock().take() {
            if let Err(e) = watcher.unwatch(&self.path) {
                // The directory may already be gone
                trace!(path = %self.path.display(), "Unwatch failed: {}", e);
            }
        }
        debug!(path = %self.path.display(), "Subscription closed");
    }
}

impl Drop for DirectorySubscriber {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for DirectorySubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySubscriber")
            .field("path", &self.path)
            .field("active", &self.is_active())
            .finish()
    }
}

fn subscription_error(path: &Path, e: notify::Error) -> Error {
    Error::Subscription {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
