use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::proc_loader::file_to_config;
use crate::config::service::ServiceConfig;

/// Load the service config named on the command line.
pub async fn run(config_path: &str) -> Result<ServiceConfig> {
    let path = Path::new(config_path);
    let service_config = file_to_config(path)
        .await
        .with_context(|| format!("invalid config '{}'", config_path))?;
    debug!(stores = service_config.stores.len(), "config loaded");
    Ok(service_config)
}
