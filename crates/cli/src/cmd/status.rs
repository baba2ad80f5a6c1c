//! Show daemon and cache status

use crate::locks;
use crate::system_config::SystemConfig;
use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use watcher::desired_folders;

pub async fn run(config: &SystemConfig) -> Result<()> {
    let store = util::open_store(config)?;
    let document = store.document()?;
    let desired = desired_folders(&store)?;

    println!("{}", "Folio status".bold());
    println!("  {}: {}", "Data directory".dimmed(), store.root().display());

    match locks::current_holder(store.root())? {
        Some(holder) => println!(
            "  {}: {} {}",
            "Daemon".dimmed(),
            "running".green(),
            format!(
                "(pid {}, started {})",
                holder.pid,
                util::format_relative_time(holder.started_at)
            )
            .dimmed()
        ),
        None => println!("  {}: {}", "Daemon".dimmed(), "stopped".red()),
    }

    println!("  {}: {}", "Favorites".dimmed(), document.favorites.len());
    println!("  {}: {}", "Dynamic sources".dimmed(), document.dynamic_sources.len());
    println!("  {}: {}", "Watched folders".dimmed(), desired.len());

    if !desired.is_empty() {
        println!("\n{}", "Folders".bold());
        for (path, name) in &desired {
            let cached = match store.load_listing(path) {
                Ok(Some(listing)) => format!(
                    "{} items, {}",
                    listing.items.len(),
                    util::format_relative_time(listing.saved_at)
                ),
                Ok(None) => "not cached".to_string(),
                Err(e) => format!("unreadable: {}", e),
            };
            let heavy = if document.is_heavy(path) { " heavy".yellow().to_string() } else { String::new() };
            println!("  {} {} {}{}", name.cyan(), path.display(), format!("({})", cached).dimmed(), heavy);
        }
    }

    if !document.heavy.is_empty() {
        println!("\n{}", "Heavy folders".bold());
        for mark in &document.heavy {
            println!(
                "  {} {}",
                mark.path.display(),
                format!("({} items when marked)", mark.item_count).dimmed()
            );
        }
    }
    Ok(())
}
