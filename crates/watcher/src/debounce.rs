//! Per-path debouncing
//!
//! Each raw change replaces the pending timer for its path, so a burst of
//! events fires once, one quiet interval after the last event.

use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// A scheduled fire for one path
#[derive(Debug)]
pub struct PendingDebounce {
    pub fire_at: Instant,
    generation: u64,
    timer: JoinHandle<()>,
}

/// At most one pending timer per path
///
/// Not thread-safe by itself; owned by the controller's single-writer task.
#[derive(Debug)]
pub struct DebounceMap {
    quiet: Duration,
    pending: AHashMap<PathBuf, PendingDebounce>,
    next_generation: u64,
}

impl DebounceMap {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: AHashMap::new(),
            next_generation: 0,
        }
    }

    /// (Re)arm the timer for `path`
    ///
    /// `on_fire(path, generation)` runs when the timer elapses; pass the
    /// generation back to `take_if_current` to confirm it was not superseded.
    pub fn schedule<F>(&mut self, path: &Path, on_fire: F) -> u64
    where
        F: FnOnce(PathBuf, u64) + Send + 'static,
    {
        self.cancel(path);

        self.next_generation += 1;
        let generation = self.next_generation;
        let fire_at = Instant::now() + self.quiet;
        let fire_path = path.to_path_buf();

        let timer = tokio::spawn(async move {
            sleep_until(fire_at).await;
            on_fire(fire_path, generation);
        });

        self.pending.insert(
            path.to_path_buf(),
            PendingDebounce {
                fire_at,
                generation,
                timer,
            },
        );
        generation
    }

    /// Claim a fired timer. False if it was cancelled or replaced meanwhile.
    pub fn take_if_current(&mut self, path: &Path, generation: u64) -> bool {
        match self.pending.get(path) {
            Some(pending) if pending.generation == generation => {
                self.pending.remove(path);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self, path: &Path) -> bool {
        match self.pending.remove(path) {
            Some(pending) => {
                pending.timer.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, pending) in self.pending.drain() {
            pending.timer.abort();
        }
        count
    }

    pub fn get(&self, path: &Path) -> Option<&PendingDebounce> {
        self.pending.get(path)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Drop for DebounceMap {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
