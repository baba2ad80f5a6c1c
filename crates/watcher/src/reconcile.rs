//! Periodic reconciliation against the desired-state source
//!
//! Re-reads favorites and dynamic sources on an interval and converges the
//! controller's watched set on them. Folders that failed to watch on one
//! pass are retried on the next.

use crate::controller::{ReconcileReport, WatchController};
use folio_core::{DesiredStateSource, RefreshQueue, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Desired watch set: favorites and dynamic sources, path -> display name
///
/// A path that is both keeps the favorite's display name. Dynamic sources
/// are named after their last path component.
pub fn desired_folders(source: &dyn DesiredStateSource) -> Result<BTreeMap<PathBuf, String>> {
    let mut desired = BTreeMap::new();

    for favorite in source.list_favorite_folders()? {
        desired.insert(favorite.path, favorite.display_name);
    }

    for dynamic in source.list_dynamic_source_folders()? {
        let name = dynamic
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dynamic.path.display().to_string());
        desired.entry(dynamic.path).or_insert(name);
    }

    Ok(desired)
}

/// Periodic reconciler
pub struct PeriodicReconciler {
    source: Arc<dyn DesiredStateSource>,
    controller: WatchController,
    /// Scan interval (default: 5 seconds)
    interval: Duration,
    /// When set, newly watched folders get an initial refresh
    warm_queue: Option<Arc<dyn RefreshQueue>>,
}

impl PeriodicReconciler {
    pub fn new(
        source: Arc<dyn DesiredStateSource>,
        controller: WatchController,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            controller,
            interval,
            warm_queue: None,
        }
    }

    /// Enqueue a refresh for every folder that starts being watched
    pub fn with_initial_refresh(mut self, queue: Arc<dyn RefreshQueue>) -> Self {
        self.warm_queue = Some(queue);
        self
    }

    /// One reconcile pass
    ///
    /// A source read failure leaves the watched set untouched.
    pub async fn reconcile_once(&self) -> Result<ReconcileReport> {
        let desired = desired_folders(self.source.as_ref())?;
        let report = self.controller.reconcile(desired.clone()).await;

        if let Some(queue) = &self.warm_queue {
            for path in &report.added {
                if let Some(name) = desired.get(path) {
                    queue.enqueue(path, name);
                }
            }
        }

        Ok(report)
    }

    /// Run the reconciliation loop
    ///
    /// Runs indefinitely; the first pass happens immediately.
    pub async fn run(self) {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting periodic reconciliation (interval: {:?})", self.interval);

        loop {
            timer.tick().await;

            match self.reconcile_once().await {
                Ok(report) if report.is_noop() => {
                    debug!(failed = report.failed.len(), "Reconciliation: watch set unchanged");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Reconciliation skipped, desired state unreadable: {}", e);
                }
            }
        }
    }
}
