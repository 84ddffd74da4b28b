//! Command implementations

pub mod deploy;
pub mod scan;
pub mod watch;

use anyhow::Result;
use model_deployer_core::DeployerConfig;
use std::path::Path;
use tracing::debug;

/// Load the configuration file if one was given, defaults otherwise
pub fn load_config(path: Option<&Path>) -> Result<DeployerConfig> {
    match path {
        Some(path) => {
            debug!("Loading configuration from {}", path.display());
            DeployerConfig::from_file(path)
        }
        None => Ok(DeployerConfig::default()),
    }
}
