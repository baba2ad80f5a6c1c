//! Folio refresh pipeline
//!
//! Turns debounced change signals into rebuilt listings:
//! - `RefreshScheduler`: FIFO queue with a concurrency ceiling and per-path coalescing
//! - `Rebuilder`: list, sort, truncate, classify, persist, notify
//! - `BroadcastNotifier`: fans listing changes out to in-process observers

pub mod job;
pub mod notifier;
pub mod scheduler;

pub use job::{JobOutcome, Rebuild, Rebuilder, RefreshJob};
pub use notifier::{BroadcastNotifier, ListingChanged};
pub use scheduler::{
    JobInfo, JobState, Priority, RefreshScheduler, SchedulerConfig, SchedulerStats,
    DEFAULT_MAX_CONCURRENCY,
};
