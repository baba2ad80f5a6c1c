//! List accepted sort order names

use folio_core::SortOrder;
use owo_colors::OwoColorize;

pub fn run() {
    for order in SortOrder::ALL {
        let marker = if order == SortOrder::default() { " (default)" } else { "" };
        println!("{:<16} {}{}", order.as_str().cyan(), order.description(), marker.dimmed());
    }
}
