//! Manage dynamic source folders

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::Result;
use folio_core::DesiredStateSource;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run_add(
    config: &SystemConfig,
    path: &Path,
    max_items: Option<usize>,
    sort: Option<&str>,
) -> Result<()> {
    let folder = util::existing_folder(path)?;
    let settings = util::folder_settings(config, max_items, sort)?;
    let store = util::open_store(config)?;

    let added = store.add_dynamic_source(&folder, settings)?;
    let verb = if added { "Added" } else { "Updated" };
    println!("{} source {}", verb.green(), folder.display());
    if store.is_heavy_folder(&folder)? {
        println!("  {}", "Marked as heavy folder".yellow());
    }
    Ok(())
}

pub async fn run_remove(config: &SystemConfig, path: &Path) -> Result<()> {
    let folder = util::absolute_folder(path)?;
    let store = util::open_store(config)?;

    if store.remove_dynamic_source(&folder)? {
        println!("{} source {}", "Removed".green(), folder.display());
        Ok(())
    } else {
        anyhow::bail!("Not a dynamic source: {}", folder.display())
    }
}

pub async fn run_list(config: &SystemConfig) -> Result<()> {
    let store = util::open_store(config)?;
    let sources = store.list_dynamic_source_folders()?;

    if sources.is_empty() {
        println!("{}", "No dynamic sources".dimmed());
        return Ok(());
    }

    println!("{}", "Dynamic sources".bold());
    for source in sources {
        let heavy = if store.is_heavy_folder(&source.path)? {
            " heavy".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            source.path.display(),
            format!("({} items, {})", source.settings.max_items, source.settings.sort_order).dimmed(),
            heavy
        );
    }
    Ok(())
}
