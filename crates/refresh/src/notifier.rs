//! In-process listing change fan-out

use folio_core::ChangeNotifier;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::trace;

const DEFAULT_CAPACITY: usize = 256;

/// A cached listing was replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingChanged {
    pub provider_id: String,
    pub path: PathBuf,
}

/// Broadcasts `ListingChanged` to every subscriber
///
/// Slow subscribers lag and drop old events; publishing never blocks.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<ListingChanged>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListingChanged> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn notify(&self, provider_id: &str, path: &Path) {
        let event = ListingChanged {
            provider_id: provider_id.to_string(),
            path: path.to_path_buf(),
        };
        // No receivers is fine
        if self.tx.send(event).is_err() {
            trace!(path = %path.display(), "Listing change with no subscribers");
        }
    }
}
