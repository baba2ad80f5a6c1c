//! Manage favorite folders

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::Result;
use folio_core::DesiredStateSource;
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run_add(
    config: &SystemConfig,
    path: &Path,
    name: Option<&str>,
    max_items: Option<usize>,
    sort: Option<&str>,
) -> Result<()> {
    let folder = util::existing_folder(path)?;
    let settings = util::folder_settings(config, max_items, sort)?;
    let store = util::open_store(config)?;

    let added = store.add_favorite(&folder, name, settings)?;
    let verb = if added { "Added" } else { "Updated" };
    println!(
        "{} favorite {} {}",
        verb.green(),
        folder.display(),
        format!("({} items, {})", settings.max_items, settings.sort_order).dimmed()
    );
    Ok(())
}

pub async fn run_remove(config: &SystemConfig, path: &Path) -> Result<()> {
    let folder = util::absolute_folder(path)?;
    let store = util::open_store(config)?;

    if store.remove_favorite(&folder)? {
        println!("{} favorite {}", "Removed".green(), folder.display());
        Ok(())
    } else {
        anyhow::bail!("Not a favorite: {}", folder.display())
    }
}

pub async fn run_list(config: &SystemConfig) -> Result<()> {
    let store = util::open_store(config)?;
    let favorites = store.list_favorite_folders()?;

    if favorites.is_empty() {
        println!("{}", "No favorite folders".dimmed());
        return Ok(());
    }

    println!("{}", "Favorite folders".bold());
    for favorite in favorites {
        let heavy = if favorite.is_heavy { " heavy".yellow().to_string() } else { String::new() };
        println!(
            "  {} {} {}{}",
            favorite.display_name.cyan(),
            favorite.path.display(),
            format!("({} items, {})", favorite.settings.max_items, favorite.settings.sort_order).dimmed(),
            heavy
        );
    }
    Ok(())
}
