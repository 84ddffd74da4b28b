//! Directory to model collection synchronization

pub mod dispatcher;
pub mod scheduler;


pub use dispatcher::{CycleReport, Dispatcher, Outcome, SkipReason};
pub use scheduler::{DirectorySync, SyncControl, SyncState};

use crate::collection::ModelCollection;
use crate::config::{DeployerConfig, WatchMode};
use crate::error::SyncResult;
use crate::monitor::{ChangeSource, NotifySource, PollingSource};
use std::sync::Arc;

/// Build the change source selected by `config.mode`
pub fn change_source(config: &DeployerConfig) -> SyncResult<Box<dyn ChangeSource>> {
    let dir = config.model_dir()?;

    let source: Box<dyn ChangeSource> = match config.mode {
        WatchMode::Poll => Box::new(PollingSource::new(dir, config.poll_interval())),
        WatchMode::Notify => Box::new(NotifySource::new(dir, config.settle())?),
    };
    Ok(source)
}

impl DirectorySync {
    /// Sync loop for a configuration, validated first
    pub fn from_config(config: &DeployerConfig, collection: Arc<dyn ModelCollection>) -> SyncResult<Self> {
        config.validate()?;
        let source = change_source(config)?;
        Ok(Self::new(source, collection, config.warmup()))
    }
}
