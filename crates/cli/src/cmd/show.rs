//! Print a folder's cached listing

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(config: &SystemConfig, path: &Path, json: bool, limit: Option<usize>) -> Result<()> {
    let folder = util::absolute_folder(path)?;
    let store = util::open_store(config)?;

    let Some(mut listing) = store.load_listing(&folder)? else {
        anyhow::bail!(
            "No cached listing for {} (run 'folio refresh {}')",
            folder.display(),
            folder.display()
        );
    };
    if let Some(limit) = limit {
        listing.items.truncate(limit);
    }

    if json {
        let text = serde_json::to_string_pretty(&listing).context("Failed to encode listing")?;
        println!("{}", text);
        return Ok(());
    }

    println!("{}", folder.display().to_string().bold());
    println!(
        "{}",
        format!(
            "{} items, {}, saved {}",
            listing.items.len(),
            listing.cache_type,
            util::format_relative_time(listing.saved_at)
        )
        .dimmed()
    );

    for item in &listing.items {
        let name = if item.is_directory {
            format!("{}/", item.name).blue().to_string()
        } else if item.is_image {
            item.name.magenta().to_string()
        } else {
            item.name.clone()
        };
        let size = if item.is_directory { "-".to_string() } else { util::format_size(item.size) };
        println!(
            "  {:>10}  {:<16}  {}",
            size.dimmed(),
            util::format_relative_time(item.modified).dimmed(),
            name
        );
    }
    Ok(())
}
