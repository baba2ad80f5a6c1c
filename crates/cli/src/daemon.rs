//! Watch daemon: keeps cached listings in sync with the folders on disk

use crate::locks::DaemonLock;
use crate::system_config::SystemConfig;
use anyhow::{Context, Result};
use folio_core::RefreshQueue;
use refresh::{BroadcastNotifier, ListingChanged, Rebuilder, RefreshScheduler};
use std::sync::Arc;
use store::FileStore;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use watcher::{PeriodicReconciler, WatchController};

/// Run the daemon until Ctrl-C or SIGTERM
pub async fn run(config: &SystemConfig) -> Result<()> {
    let data_dir = config.data_dir()?;
    let lock = DaemonLock::acquire(&data_dir)?;

    let store = Arc::new(
        FileStore::open(&data_dir)
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?,
    );

    let notifier = BroadcastNotifier::new();
    let change_log = tokio::spawn(log_changes(notifier.subscribe()));

    let rebuilder = Rebuilder::new(store.clone(), store.clone(), Arc::new(notifier.clone()))
        .with_defaults(config.listing_defaults());
    let scheduler = RefreshScheduler::new(Arc::new(rebuilder), config.scheduler_config());
    let queue: Arc<dyn RefreshQueue> = Arc::new(scheduler.clone());
    let controller = WatchController::new(queue.clone(), config.watcher_config());

    // Every folder is new to the first pass, so each gets one warm-up refresh
    let reconciler =
        PeriodicReconciler::new(store.clone(), controller.clone(), config.reconcile_interval())
            .with_initial_refresh(queue);
    let reconcile_loop = tokio::spawn(reconciler.run());

    info!(
        data_dir = %data_dir.display(),
        debounce_ms = config.watcher.debounce_ms,
        max_concurrency = scheduler.config().max_concurrency,
        "Folio daemon started"
    );

    shutdown_signal().await?;
    info!("Shutting down");

    reconcile_loop.abort();
    let stopped = controller.stop_all().await;
    let dropped = scheduler.shutdown();
    scheduler.wait_idle().await;
    change_log.abort();

    info!(stopped, dropped, "Folio daemon stopped");
    lock.release()?;
    Ok(())
}

async fn log_changes(mut changes: broadcast::Receiver<ListingChanged>) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                debug!(provider = %change.provider_id, path = %change.path.display(), "Listing changed")
            }
            Err(RecvError::Lagged(missed)) => warn!(missed, "Change log fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")
}
