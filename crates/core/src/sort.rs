//! Sort orders for cached listings

use crate::error::Error;
use crate::item::Item;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Ordering strategy applied to a folder's items before truncation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    NameAsc,
    NameDesc,
    #[default]
    ModifiedNewest,
    ModifiedOldest,
    CreatedNewest,
    CreatedOldest,
    /// Directories first, then by name ascending
    FoldersFirst,
    SizeDesc,
    SizeAsc,
    AddedNewest,
    AddedOldest,
}

impl SortOrder {
    /// Every sort order, in display order
    pub const ALL: [SortOrder; 11] = [
        SortOrder::NameAsc,
        SortOrder::NameDesc,
        SortOrder::ModifiedNewest,
        SortOrder::ModifiedOldest,
        SortOrder::CreatedNewest,
        SortOrder::CreatedOldest,
        SortOrder::FoldersFirst,
        SortOrder::SizeDesc,
        SortOrder::SizeAsc,
        SortOrder::AddedNewest,
        SortOrder::AddedOldest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::NameAsc => "name-asc",
            SortOrder::NameDesc => "name-desc",
            SortOrder::ModifiedNewest => "modified-newest",
            SortOrder::ModifiedOldest => "modified-oldest",
            SortOrder::CreatedNewest => "created-newest",
            SortOrder::CreatedOldest => "created-oldest",
            SortOrder::FoldersFirst => "folders-first",
            SortOrder::SizeDesc => "size-desc",
            SortOrder::SizeAsc => "size-asc",
            SortOrder::AddedNewest => "added-newest",
            SortOrder::AddedOldest => "added-oldest",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            SortOrder::NameAsc => "Name (A to Z)",
            SortOrder::NameDesc => "Name (Z to A)",
            SortOrder::ModifiedNewest => "Date modified (newest first)",
            SortOrder::ModifiedOldest => "Date modified (oldest first)",
            SortOrder::CreatedNewest => "Date created (newest first)",
            SortOrder::CreatedOldest => "Date created (oldest first)",
            SortOrder::FoldersFirst => "Folders first, then name",
            SortOrder::SizeDesc => "Size (largest first)",
            SortOrder::SizeAsc => "Size (smallest first)",
            SortOrder::AddedNewest => "Date added (newest first)",
            SortOrder::AddedOldest => "Date added (oldest first)",
        }
    }

    /// Compare two items under this ordering
    ///
    /// Ties are broken by name so the result never depends on listing order.
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let primary = match self {
            SortOrder::NameAsc => return compare_names(a, b),
            SortOrder::NameDesc => return compare_names(b, a),
            SortOrder::ModifiedNewest => b.modified.cmp(&a.modified),
            SortOrder::ModifiedOldest => a.modified.cmp(&b.modified),
            SortOrder::CreatedNewest => b.created.cmp(&a.created),
            SortOrder::CreatedOldest => a.created.cmp(&b.created),
            SortOrder::FoldersFirst => b.is_directory.cmp(&a.is_directory),
            SortOrder::SizeDesc => b.size.cmp(&a.size),
            SortOrder::SizeAsc => a.size.cmp(&b.size),
            SortOrder::AddedNewest => b.added.cmp(&a.added),
            SortOrder::AddedOldest => a.added.cmp(&b.added),
        };
        primary.then_with(|| compare_names(a, b))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SortOrder::ALL
            .iter()
            .copied()
            .find(|order| order.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::InvalidSortOrder(s.to_string()))
    }
}

/// Case-insensitive name comparison with a case-sensitive tiebreak
fn compare_names(a: &Item, b: &Item) -> Ordering {
    let folded_a = a.name.chars().flat_map(char::to_lowercase);
    let folded_b = b.name.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| a.name.cmp(&b.name))
}

/// Sort the full list, then keep the first `max_items`
pub fn sort_and_truncate(items: &mut Vec<Item>, order: SortOrder, max_items: usize) {
    items.sort_by(|a, b| order.compare(a, b));
    items.truncate(max_items);
}
