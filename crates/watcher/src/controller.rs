//! Watch set controller
//!
//! All watch-set state (watched directories and pending debounces) lives in
//! one task. Every mutation, including raw change signals from subscribers
//! and debounce timer fires, is a message on that task's queue and runs to
//! completion in submission order, so none of them can race.

use crate::debounce::DebounceMap;
use crate::subscriber::DirectorySubscriber;
use crate::WatcherConfig;
use ahash::AHashMap;
use folio_core::RefreshQueue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Outcome of one reconcile pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Paths that started being watched
    pub added: Vec<PathBuf>,
    /// Paths that stopped being watched
    pub removed: Vec<PathBuf>,
    /// Desired paths that could not be watched (retried on the next pass)
    pub failed: Vec<PathBuf>,
}

impl ReconcileReport {
    /// True when the pass started or stopped nothing
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

enum Command {
    Start {
        path: PathBuf,
        display_name: String,
        reply: oneshot::Sender<bool>,
    },
    Stop {
        path: PathBuf,
        reply: oneshot::Sender<bool>,
    },
    StopAll {
        reply: oneshot::Sender<usize>,
    },
    Reconcile {
        desired: BTreeMap<PathBuf, String>,
        reply: oneshot::Sender<ReconcileReport>,
    },
    RawChange {
        path: PathBuf,
    },
    DebounceFired {
        path: PathBuf,
        generation: u64,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<(PathBuf, String)>>,
    },
    PendingDebounces {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the watch set
///
/// Cheap to clone. The owning task exits, stopping every subscription, once
/// the last handle is dropped.
#[derive(Clone)]
pub struct WatchController {
    tx: UnboundedSender<Command>,
}

impl WatchController {
    /// Spawn the controller task on the current tokio runtime
    pub fn new(queue: Arc<dyn RefreshQueue>, config: WatcherConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = ControllerState {
            watched: AHashMap::new(),
            debounces: DebounceMap::new(config.quiet_interval),
            queue,
            self_tx: tx.downgrade(),
        };
        tokio::spawn(state.run(rx));
        Self { tx }
    }

    /// Watch `path`. False (and logged) if missing, not a directory,
    /// already watched, or the subscription could not be opened.
    pub async fn start_watching(&self, path: &Path, display_name: &str) -> bool {
        self.request(|reply| Command::Start {
            path: path.to_path_buf(),
            display_name: display_name.to_string(),
            reply,
        })
        .await
        .unwrap_or(false)
    }

    /// Stop watching `path`, dropping its pending debounce. False if not watched.
    pub async fn stop_watching(&self, path: &Path) -> bool {
        self.request(|reply| Command::Stop {
            path: path.to_path_buf(),
            reply,
        })
        .await
        .unwrap_or(false)
    }

    /// Stop every subscription and debounce. Returns how many paths were watched.
    pub async fn stop_all(&self) -> usize {
        self.request(|reply| Command::StopAll { reply })
            .await
            .unwrap_or(0)
    }

    /// Converge the watched set on `desired` (path -> display name)
    pub async fn reconcile(&self, desired: BTreeMap<PathBuf, String>) -> ReconcileReport {
        self.request(|reply| Command::Reconcile { desired, reply })
            .await
            .unwrap_or_default()
    }

    /// Raw change signal for a watched directory; (re)arms its debounce
    pub fn on_raw_change(&self, path: &Path) {
        let _ = self.tx.send(Command::RawChange {
            path: path.to_path_buf(),
        });
    }

    /// Snapshot of watched paths, sorted
    pub async fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched()
            .await
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    /// Snapshot of (path, display name), sorted by path
    pub async fn watched(&self) -> Vec<(PathBuf, String)> {
        self.request(|reply| Command::Snapshot { reply })
            .await
            .unwrap_or_default()
    }

    pub async fn pending_debounces(&self) -> usize {
        self.request(|reply| Command::PendingDebounces { reply })
            .await
            .unwrap_or(0)
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(make(reply)).ok()?;
        rx.await.ok()
    }
}

impl std::fmt::Debug for WatchController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchController")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// A directory under observation
struct WatchedDirectory {
    display_name: String,
    subscriber: DirectorySubscriber,
}

struct ControllerState {
    watched: AHashMap<PathBuf, WatchedDirectory>,
    debounces: DebounceMap,
    queue: Arc<dyn RefreshQueue>,
    /// Weak so subscribers and timers never keep the controller alive
    self_tx: WeakUnboundedSender<Command>,
}

impl ControllerState {
    async fn run(mut self, mut rx: UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }

        let remaining = self.stop_all();
        debug!(remaining, "Watch controller exiting");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Start {
                path,
                display_name,
                reply,
            } => {
                let _ = reply.send(self.start_watching(path, display_name));
            }
            Command::Stop { path, reply } => {
                let _ = reply.send(self.stop_watching(&path));
            }
            Command::StopAll { reply } => {
                let _ = reply.send(self.stop_all());
            }
            Command::Reconcile { desired, reply } => {
                let _ = reply.send(self.reconcile(desired));
            }
            Command::RawChange { path } => self.on_raw_change(path),
            Command::DebounceFired { path, generation } => self.on_debounce_fired(path, generation),
            Command::Snapshot { reply } => {
                let mut snapshot: Vec<_> = self
                    .watched
                    .iter()
                    .map(|(path, dir)| (path.clone(), dir.display_name.clone()))
                    .collect();
                snapshot.sort();
                let _ = reply.send(snapshot);
            }
            Command::PendingDebounces { reply } => {
                let _ = reply.send(self.debounces.len());
            }
        }
    }

    fn start_watching(&mut self, path: PathBuf, display_name: String) -> bool {
        if self.watched.contains_key(&path) {
            debug!(path = %path.display(), "Already watching");
            return false;
        }

        let tx = self.self_tx.clone();
        let subscriber = DirectorySubscriber::open(&path, move |changed| {
            // Controller gone: nothing left to notify
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::RawChange {
                    path: changed.to_path_buf(),
                });
            }
        });

        match subscriber {
            Ok(subscriber) => {
                info!(path = %path.display(), name = %display_name, "Watching directory");
                self.watched.insert(
                    path,
                    WatchedDirectory {
                        display_name,
                        subscriber,
                    },
                );
                true
            }
            Err(e) => {
                warn!(path = %path.display(), "Not watching directory: {}", e);
                false
            }
        }
    }

    fn stop_watching(&mut self, path: &Path) -> bool {
        self.debounces.cancel(path);
        self.queue.cancel_pending(path);

        match self.watched.remove(path) {
            Some(dir) => {
                dir.subscriber.stop();
                info!(path = %path.display(), "Stopped watching directory");
                true
            }
            None => false,
        }
    }

    fn stop_all(&mut self) -> usize {
        let cancelled = self.debounces.cancel_all();
        let count = self.watched.len();
        for (_, dir) in self.watched.drain() {
            dir.subscriber.stop();
        }
        if count > 0 || cancelled > 0 {
            info!(count, cancelled, "Stopped all watches");
        }
        count
    }

    fn reconcile(&mut self, desired: BTreeMap<PathBuf, String>) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let mut to_remove: Vec<PathBuf> = self
            .watched
            .keys()
            .filter(|path| !desired.contains_key(*path))
            .cloned()
            .collect();
        to_remove.sort();

        for path in to_remove {
            if self.stop_watching(&path) {
                report.removed.push(path);
            }
        }

        for (path, display_name) in desired {
            if self.watched.contains_key(&path) {
                continue;
            }
            if self.start_watching(path.clone(), display_name) {
                report.added.push(path);
            } else {
                report.failed.push(path);
            }
        }

        if !report.is_noop() {
            info!(
                added = report.added.len(),
                removed = report.removed.len(),
                failed = report.failed.len(),
                watched = self.watched.len(),
                "Reconciled watch set"
            );
        }
        report
    }

    fn on_raw_change(&mut self, path: PathBuf) {
        if !self.watched.contains_key(&path) {
            debug!(path = %path.display(), "Change for unwatched path ignored");
            return;
        }

        let tx = self.self_tx.clone();
        self.debounces.schedule(&path, move |path, generation| {
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::DebounceFired { path, generation });
            }
        });
    }

    fn on_debounce_fired(&mut self, path: PathBuf, generation: u64) {
        if !self.debounces.take_if_current(&path, generation) {
            return;
        }

        // Debounces are cancelled on stop, so the path is still watched
        if let Some(dir) = self.watched.get(&path) {
            if self.queue.enqueue(&path, &dir.display_name) {
                debug!(path = %path.display(), "Refresh enqueued after quiet interval");
            } else {
                debug!(path = %path.display(), "Refresh already pending, coalesced");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::{sleep, Instant};

    #[derive(Default)]
    struct RecordingQueue {
        enqueued: Mutex<Vec<(PathBuf, String, Instant)>>,
        cancelled: Mutex<Vec<PathBuf>>,
    }

    impl RefreshQueue for RecordingQueue {
        fn enqueue(&self, path: &Path, display_name: &str) -> bool {
            self.enqueued
                .lock()
                .push((path.to_path_buf(), display_name.to_string(), Instant::now()));
            true
        }

        fn cancel_pending(&self, path: &Path) -> bool {
            self.cancelled.lock().push(path.to_path_buf());
            false
        }
    }

    fn controller() -> (WatchController, Arc<RecordingQueue>) {
        let queue = Arc::new(RecordingQueue::default());
        let controller = WatchController::new(queue.clone(), WatcherConfig::default());
        (controller, queue)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_produces_one_refresh_after_last_event() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();
        let (controller, queue) = controller();
        assert!(controller.start_watching(&path, "d").await);

        for _ in 0..5 {
            controller.on_raw_change(&path);
            sleep(Duration::from_millis(300)).await;
        }
        // Last event at t=1.2s; the first event's timer would have fired at 1.0s
        let last_event = Instant::now() - Duration::from_millis(300);
        assert_eq!(controller.pending_debounces().await, 1);
        assert!(queue.enqueued.lock().is_empty());

        sleep(Duration::from_millis(800)).await;
        assert_eq!(controller.pending_debounces().await, 0);

        let enqueued = queue.enqueued.lock().clone();
        assert_eq!(enqueued.len(), 1);
        assert_eq!(enqueued[0].0, path);
        assert_eq!(enqueued[0].1, "d");
        assert!(enqueued[0].2 - last_event >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_watching_cancels_pending_debounce() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();
        let (controller, queue) = controller();
        assert!(controller.start_watching(&path, "d").await);

        controller.on_raw_change(&path);
        assert_eq!(controller.pending_debounces().await, 1);
        assert!(controller.stop_watching(&path).await);
        assert_eq!(controller.pending_debounces().await, 0);

        sleep(Duration::from_secs(3)).await;
        assert!(queue.enqueued.lock().is_empty());
        assert_eq!(queue.cancelled.lock().as_slice(), &[path.clone()]);
        assert!(controller.watched_paths().await.is_empty());
        assert!(!controller.stop_watching(&path).await);
    }

    #[tokio::test]
    async fn test_start_watching_rejects_invalid_and_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        let (controller, _queue) = controller();

        assert!(!controller.start_watching(&temp_dir.path().join("missing"), "m").await);
        assert!(!controller.start_watching(&file, "f").await);
        assert!(controller.start_watching(temp_dir.path(), "d").await);
        assert!(!controller.start_watching(temp_dir.path(), "again").await);

        let watched = controller.watched().await;
        assert_eq!(watched, vec![(temp_dir.path().to_path_buf(), "d".to_string())]);
    }

    #[tokio::test]
    async fn test_reconcile_adds_removes_and_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        let c = temp_dir.path().join("c");
        for dir in [&a, &b, &c] {
            std::fs::create_dir(dir).unwrap();
        }
        let (controller, _queue) = controller();

        let desired: BTreeMap<_, _> = [(a.clone(), "A".to_string()), (b.clone(), "B".to_string())].into();
        let first = controller.reconcile(desired.clone()).await;
        assert_eq!(first.added, vec![a.clone(), b.clone()]);
        assert!(first.removed.is_empty());

        let second = controller.reconcile(desired).await;
        assert!(second.is_noop());
        assert!(second.failed.is_empty());

        let next: BTreeMap<_, _> = [(b.clone(), "renamed".to_string()), (c.clone(), "C".to_string())].into();
        let third = controller.reconcile(next).await;
        assert_eq!(third.added, vec![c.clone()]);
        assert_eq!(third.removed, vec![a]);

        // Paths present in both sets are left alone, display name included
        let watched = controller.watched().await;
        assert_eq!(watched[0], (b, "B".to_string()));
        assert_eq!(watched.len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_retries_failed_paths() {
        let temp_dir = TempDir::new().unwrap();
        let later = temp_dir.path().join("later");
        let (controller, _queue) = controller();
        let desired: BTreeMap<_, _> = [(later.clone(), "L".to_string())].into();

        let first = controller.reconcile(desired.clone()).await;
        assert_eq!(first.failed, vec![later.clone()]);
        assert!(first.is_noop());

        std::fs::create_dir(&later).unwrap();
        let second = controller.reconcile(desired).await;
        assert_eq!(second.added, vec![later]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_clears_everything() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("a");
        let b = temp_dir.path().join("b");
        std::fs::create_dir(&a).unwrap();
        std::fs::create_dir(&b).unwrap();
        let (controller, queue) = controller();
        controller.start_watching(&a, "A").await;
        controller.start_watching(&b, "B").await;
        controller.on_raw_change(&a);

        assert_eq!(controller.stop_all().await, 2);
        assert!(controller.watched_paths().await.is_empty());
        assert_eq!(controller.pending_debounces().await, 0);

        sleep(Duration::from_secs(2)).await;
        assert!(queue.enqueued.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_for_unwatched_path_is_ignored() {
        let (controller, queue) = controller();
        controller.on_raw_change(Path::new("/not/watched"));
        assert_eq!(controller.pending_debounces().await, 0);

        sleep(Duration::from_secs(2)).await;
        assert!(queue.enqueued.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_burst_after_fire_enqueues_again() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().to_path_buf();
        let (controller, queue) = controller();
        controller.start_watching(&path, "d").await;

        controller.on_raw_change(&path);
        sleep(Duration::from_millis(1500)).await;
        controller.on_raw_change(&path);
        sleep(Duration::from_millis(1500)).await;

        assert_eq!(queue.enqueued.lock().len(), 2);
    }
}
