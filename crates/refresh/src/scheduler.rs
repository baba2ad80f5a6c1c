//! Bounded refresh scheduler
//!
//! FIFO queue of rebuild jobs with a fixed concurrency ceiling. At most one
//! job per path is queued-or-running; duplicate requests are dropped until
//! that job finishes.

use crate::job::{JobOutcome, Rebuild, RefreshJob};
use folio_core::{CancelFlag, RefreshQueue};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Default number of rebuilds allowed to run at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

/// Scheduling priority of rebuild work relative to other runtime tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Yield to other ready tasks before each job starts
    #[default]
    Low,
    Normal,
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrency: usize,
    pub priority: Priority,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            priority: Priority::Low,
        }
    }
}

/// Lifecycle state of a live job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running,
}

/// Snapshot of one queued or running job
#[derive(Debug, Clone)]
pub struct JobInfo {
    pub job: RefreshJob,
    pub state: JobState,
}

struct LiveJob {
    job: RefreshJob,
    state: JobState,
    cancel: CancelFlag,
}

#[derive(Default)]
struct SchedState {
    /// Queued-or-running jobs, keyed by path
    live: HashMap<PathBuf, LiveJob>,
    /// Submission order of queued jobs
    queue: VecDeque<(PathBuf, Ulid)>,
    running: usize,
    closed: bool,
    committed: u64,
    cancelled: u64,
    failed: u64,
}

struct Inner {
    state: Mutex<SchedState>,
    runner: Arc<dyn Rebuild>,
    config: SchedulerConfig,
    runtime: Handle,
    idle: Notify,
}

/// Counters since the scheduler was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub queued: usize,
    pub running: usize,
    pub committed: u64,
    pub cancelled: u64,
    pub failed: u64,
}

/// Handle to the refresh scheduler; cheap to clone
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

impl RefreshScheduler {
    /// Create a scheduler that runs jobs on the current tokio runtime
    ///
    /// Panics if called outside a runtime.
    pub fn new(runner: Arc<dyn Rebuild>, config: SchedulerConfig) -> Self {
        let config = SchedulerConfig {
            max_concurrency: config.max_concurrency.max(1),
            ..config
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(SchedState::default()),
                runner,
                config,
                runtime: Handle::current(),
                idle: Notify::new(),
            }),
        }
    }

    /// Queue a rebuild for `path`
    ///
    /// Returns false without queuing when a job for `path` is already queued
    /// or running, or the scheduler is shut down. Never blocks.
    pub fn enqueue(&self, path: &Path, display_name: &str) -> bool {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                debug!(path = %path.display(), "Scheduler closed, refresh dropped");
                return false;
            }
            if let Some(existing) = state.live.get(path) {
                debug!(path = %path.display(), job_id = %existing.job.id, "Refresh coalesced");
                return false;
            }

            let job = RefreshJob::new(path.to_path_buf(), display_name.to_string());
            debug!(path = %path.display(), job_id = %job.id, "Refresh queued");
            state.queue.push_back((job.path.clone(), job.id));
            state.live.insert(
                job.path.clone(),
                LiveJob {
                    job,
                    state: JobState::Queued,
                    cancel: CancelFlag::new(),
                },
            );
        }

        Inner::pump(&self.inner);
        true
    }

    /// User-initiated refresh; coalesces exactly like `enqueue`
    pub fn force_refresh(&self, path: &Path, display_name: &str) -> bool {
        let accepted = self.enqueue(path, display_name);
        if accepted {
            info!(path = %path.display(), "Manual refresh queued");
        } else {
            info!(path = %path.display(), "Manual refresh dropped, rebuild already pending");
        }
        accepted
    }

    /// Drop a queued job for `path` that has not started
    pub fn cancel_pending(&self, path: &Path) -> bool {
        let mut state = self.inner.state.lock();
        let queued = matches!(state.live.get(path), Some(live) if live.state == JobState::Queued);
        if !queued {
            return false;
        }

        if let Some(live) = state.live.remove(path) {
            live.cancel.cancel();
            state.cancelled += 1;
            debug!(path = %path.display(), job_id = %live.job.id, "Queued refresh cancelled");
        }
        self.inner.notify_if_idle(&state);
        true
    }

    /// Cancel the job for `path`: drop it if queued, flag it if running
    ///
    /// A running job stops at its next checkpoint and writes nothing, unless
    /// it has already committed.
    pub fn cancel(&self, path: &Path) -> bool {
        if self.cancel_pending(path) {
            return true;
        }

        let state = self.inner.state.lock();
        match state.live.get(path) {
            Some(live) => {
                live.cancel.cancel();
                debug!(path = %path.display(), job_id = %live.job.id, "Running refresh flagged for cancellation");
                true
            }
            None => false,
        }
    }

    /// Cancel every queued job and flag every running one
    pub fn cancel_all(&self) -> usize {
        let paths: Vec<PathBuf> = self.inner.state.lock().live.keys().cloned().collect();
        paths.iter().filter(|path| self.cancel(path)).count()
    }

    /// Refuse new work and drop queued jobs; running jobs finish normally
    pub fn shutdown(&self) -> usize {
        let queued: Vec<PathBuf> = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state
                .live
                .iter()
                .filter(|(_, live)| live.state == JobState::Queued)
                .map(|(path, _)| path.clone())
                .collect()
        };

        let dropped = queued.iter().filter(|path| self.cancel_pending(path)).count();
        info!(dropped, "Refresh scheduler shut down");
        dropped
    }

    /// Resolve once nothing is queued or running
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.inner.state.lock().live.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Queued and running jobs, in no particular order
    pub fn live_jobs(&self) -> Vec<JobInfo> {
        self.inner
            .state
            .lock()
            .live
            .values()
            .map(|live| JobInfo {
                job: live.job.clone(),
                state: live.state,
            })
            .collect()
    }

    pub fn is_live(&self, path: &Path) -> bool {
        self.inner.state.lock().live.contains_key(path)
    }

    pub fn stats(&self) -> SchedulerStats {
        let state = self.inner.state.lock();
        SchedulerStats {
            queued: state.live.len() - state.running,
            running: state.running,
            committed: state.committed,
            cancelled: state.cancelled,
            failed: state.failed,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }
}

impl RefreshQueue for RefreshScheduler {
    fn enqueue(&self, path: &Path, display_name: &str) -> bool {
        RefreshScheduler::enqueue(self, path, display_name)
    }

    fn cancel_pending(&self, path: &Path) -> bool {
        RefreshScheduler::cancel_pending(self, path)
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Inner {
    /// Start queued jobs while slots are free
    fn pump(this: &Arc<Inner>) {
        let mut state = this.state.lock();

        while state.running < this.config.max_concurrency {
            let Some((path, id)) = state.queue.pop_front() else {
                break;
            };

            // Skip entries whose job was cancelled or replaced while queued
            let Some(live) = state.live.get_mut(&path) else {
                continue;
            };
            if live.job.id != id || live.state != JobState::Queued || live.cancel.is_cancelled() {
                continue;
            }

            live.state = JobState::Running;
            let job = live.job.clone();
            let cancel = live.cancel.clone();
            state.running += 1;

            let inner = Arc::clone(this);
            this.runtime.spawn(async move {
                Inner::execute(inner, job, cancel).await;
            });
        }
    }

    async fn execute(this: Arc<Inner>, job: RefreshJob, cancel: CancelFlag) {
        if this.config.priority == Priority::Low {
            tokio::task::yield_now().await;
        }

        let runner = Arc::clone(&this.runner);
        let blocking_job = job.clone();
        let outcome = tokio::task::spawn_blocking(move || runner.rebuild(&blocking_job, &cancel))
            .await
            .unwrap_or_else(|e| JobOutcome::Failed(format!("rebuild task panicked: {e}")));

        match &outcome {
            JobOutcome::Committed { items } => {
                debug!(path = %job.path.display(), job_id = %job.id, items, "Refresh committed")
            }
            JobOutcome::Cancelled => {
                debug!(path = %job.path.display(), job_id = %job.id, "Refresh cancelled")
            }
            JobOutcome::Failed(e) => {
                warn!(path = %job.path.display(), job_id = %job.id, "Refresh failed: {}", e)
            }
        }

        {
            let mut state = this.state.lock();
            state.running -= 1;
            match outcome {
                JobOutcome::Committed { .. } => state.committed += 1,
                JobOutcome::Cancelled => state.cancelled += 1,
                JobOutcome::Failed(_) => state.failed += 1,
            }
            if matches!(state.live.get(&job.path), Some(live) if live.job.id == job.id) {
                state.live.remove(&job.path);
            }
            this.notify_if_idle(&state);
        }

        Inner::pump(&this);
    }

    fn notify_if_idle(&self, state: &SchedState) {
        if state.live.is_empty() {
            self.idle.notify_waiters();
        }
    }
}
