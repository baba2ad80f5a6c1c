//! Folio command-line front end and watch daemon

pub mod cmd;
pub mod daemon;
pub mod locks;
pub mod logging;
pub mod system_config;
pub mod util;
