//! Directory watching for Folio
//!
//! This crate provides:
//! - One non-recursive OS subscription per watched directory
//! - A single-writer controller owning the watched set
//! - Per-path debouncing (1s quiet interval by default)
//! - Reconciliation of the watched set against the desired-state source

pub mod controller;
pub mod debounce;
pub mod reconcile;
pub mod subscriber;

pub use controller::{ReconcileReport, WatchController};
pub use reconcile::{desired_folders, PeriodicReconciler};
pub use subscriber::DirectorySubscriber;

use std::time::Duration;

/// Quiet interval a directory must stay unchanged before a rebuild fires
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_secs(1);

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce quiet interval
    pub quiet_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiet_interval: DEFAULT_QUIET_INTERVAL,
        }
    }
}

/// Kind of directory content change that triggers a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Item created
    Create,
    /// Item contents modified
    Modify,
    /// Item removed
    Remove,
    /// Item renamed or moved
    Rename,
}

impl ChangeKind {
    /// Classify a raw notify event; `None` for events that are ignored
    /// (metadata-only changes, access, unknown)
    pub fn from_notify(kind: &notify::EventKind) -> Option<Self> {
        use notify::event::ModifyKind;
        use notify::EventKind;

        match kind {
            EventKind::Create(_) => Some(ChangeKind::Create),
            EventKind::Remove(_) => Some(ChangeKind::Remove),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Rename),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            EventKind::Modify(_) => Some(ChangeKind::Modify),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}
