//! Run the watch daemon in the foreground

use crate::system_config::SystemConfig;
use anyhow::Result;

pub async fn run(config: &SystemConfig) -> Result<()> {
    crate::daemon::run(config).await
}
