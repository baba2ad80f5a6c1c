//! CLI command implementations

pub mod config;
pub mod favorite;
pub mod refresh;
pub mod show;
pub mod sorts;
pub mod source;
pub mod status;
pub mod watch;
