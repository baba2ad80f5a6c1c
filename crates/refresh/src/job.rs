//! Rebuild job: list, sort, truncate, classify, persist, notify

use chrono::{DateTime, Utc};
use folio_core::{
    list_directory, resolve_settings, sort_and_truncate, CacheStore, CancelFlag, ChangeNotifier,
    DesiredStateSource, Error, FolderSettings, CACHE_TYPE_STANDARD, FAVORITE_FOLDER_PROVIDER,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use ulid::Ulid;

/// One scheduled or executing rebuild
#[derive(Debug, Clone)]
pub struct RefreshJob {
    pub id: Ulid,
    pub path: PathBuf,
    pub display_name: String,
    pub enqueued_at: DateTime<Utc>,
}

impl RefreshJob {
    pub fn new(path: PathBuf, display_name: String) -> Self {
        Self {
            id: Ulid::new(),
            path,
            display_name,
            enqueued_at: Utc::now(),
        }
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Listing persisted and observers notified
    Committed { items: usize },
    /// Stopped at a checkpoint; nothing was written
    Cancelled,
    /// Store rejected the write; the next trigger retries
    Failed(String),
}

/// Executes rebuilds inside a scheduler slot
///
/// Runs on a blocking thread; implementations may do synchronous I/O.
pub trait Rebuild: Send + Sync + 'static {
    fn rebuild(&self, job: &RefreshJob, cancel: &CancelFlag) -> JobOutcome;
}

/// Rebuilds a folder's cached listing from disk
pub struct Rebuilder {
    source: Arc<dyn DesiredStateSource>,
    cache: Arc<dyn CacheStore>,
    notifier: Arc<dyn ChangeNotifier>,
    defaults: FolderSettings,
}

impl Rebuilder {
    pub fn new(
        source: Arc<dyn DesiredStateSource>,
        cache: Arc<dyn CacheStore>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        Self {
            source,
            cache,
            notifier,
            defaults: FolderSettings::default(),
        }
    }

    /// Settings for folders that are neither favorites nor dynamic sources
    pub fn with_defaults(mut self, defaults: FolderSettings) -> Self {
        self.defaults = defaults;
        self
    }
}

impl Rebuild for Rebuilder {
    fn rebuild(&self, job: &RefreshJob, cancel: &CancelFlag) -> JobOutcome {
        if cancel.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        let path = job.path.as_path();
        let (settings, from) = resolve_settings(self.source.as_ref(), path, self.defaults);

        let mut items = match list_directory(path, cancel) {
            Ok(items) => items,
            Err(Error::Cancelled) => return JobOutcome::Cancelled,
            Err(e) => {
                warn!(job_id = %job.id, path = %path.display(), "Listing failed, caching empty: {}", e);
                Vec::new()
            }
        };
        if cancel.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        let total = items.len();
        sort_and_truncate(&mut items, settings.sort_order, settings.max_items);
        for item in &mut items {
            item.classify();
        }

        let cache_type = match self.cache.cache_type(path) {
            Ok(Some(cache_type)) => cache_type,
            Ok(None) => CACHE_TYPE_STANDARD.to_string(),
            Err(e) => {
                warn!(job_id = %job.id, path = %path.display(), "Cache type lookup failed: {}", e);
                CACHE_TYPE_STANDARD.to_string()
            }
        };

        if cancel.is_cancelled() {
            return JobOutcome::Cancelled;
        }

        if let Err(e) = self.cache.save_listing(path, &items, &cache_type) {
            warn!(job_id = %job.id, path = %path.display(), "Saving listing failed: {}", e);
            return JobOutcome::Failed(e.to_string());
        }

        self.notifier.notify(FAVORITE_FOLDER_PROVIDER, path);

        debug!(
            job_id = %job.id,
            path = %path.display(),
            settings = ?from,
            sort = %settings.sort_order,
            kept = items.len(),
            total,
            cache_type = %cache_type,
            "Listing rebuilt"
        );
        JobOutcome::Committed { items: items.len() }
    }
}
