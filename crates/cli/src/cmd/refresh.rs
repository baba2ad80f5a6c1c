//! Rebuild one folder's cached listing now

use crate::locks;
use crate::system_config::SystemConfig;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use refresh::{BroadcastNotifier, Rebuilder, RefreshScheduler};
use std::path::Path;
use std::sync::Arc;
use watcher::desired_folders;

pub async fn run(config: &SystemConfig, path: &Path) -> Result<()> {
    let folder = util::absolute_folder(path)?;
    let store = Arc::new(util::open_store(config)?);

    let watched_name = desired_folders(&*store)?.remove(&folder);

    // This process cannot coalesce with a rebuild running inside the daemon
    if watched_name.is_some() {
        if let Some(holder) = locks::current_holder(store.root())? {
            anyhow::bail!(
                "Daemon (pid {}) is watching {} and refreshes it on change",
                holder.pid,
                folder.display()
            );
        }
    }
    let display_name = watched_name.unwrap_or_else(|| folder.display().to_string());

    let rebuilder = Rebuilder::new(store.clone(), store.clone(), Arc::new(BroadcastNotifier::new()))
        .with_defaults(config.listing_defaults());
    let scheduler = RefreshScheduler::new(Arc::new(rebuilder), config.scheduler_config());

    if !scheduler.force_refresh(&folder, &display_name) {
        anyhow::bail!("Refresh already in progress for {}", folder.display());
    }
    scheduler.wait_idle().await;

    match store.load_listing(&folder)? {
        Some(listing) => {
            println!(
                "{} {} {}",
                "Refreshed".green(),
                display_name.cyan(),
                format!("({} items, {})", listing.items.len(), listing.cache_type).dimmed()
            );
            Ok(())
        }
        None => anyhow::bail!("Refresh of {} did not produce a listing", folder.display()),
    }
}
