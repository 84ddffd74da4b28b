//! Turns file changes into deploy and undeploy calls

use crate::collection::ModelCollection;
use crate::error::{RemoteOperation, SyncError, SyncResult};
use crate::identifier::ModelId;
use crate::monitor::{ChangeType, FileChange};
use crate::registry::TrackedSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// What happened to a single change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Deployed(ModelId),
    Undeployed(ModelId),
    Skipped(SkipReason),
}

/// Why a change needed no remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file name yields an empty identifier
    NoIdentifier,
    /// The path is no longer a regular file
    NotAFile,
    /// Delete for an identifier that is not tracked
    NotTracked,
}

/// Tally of one dispatch pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub deployed: usize,
    pub undeployed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.deployed + self.undeployed + self.skipped + self.failed == 0
    }

    fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Deployed(_) => self.deployed += 1,
            Outcome::Undeployed(_) => self.undeployed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
        }
    }
}

/// Applies changes to the remote collection and owns the [`TrackedSet`]
pub struct Dispatcher {
    collection: Arc<dyn ModelCollection>,
    tracked: TrackedSet,
}

impl Dispatcher {
    pub fn new(collection: Arc<dyn ModelCollection>) -> Self {
        Self { collection, tracked: TrackedSet::new() }
    }

    pub fn tracked(&self) -> &TrackedSet {
        &self.tracked
    }

    pub fn into_tracked(self) -> TrackedSet {
        self.tracked
    }

    /// Dispatch every change in order. A failing change is logged and does
    /// not stop the rest.
    pub async fn dispatch_all(&mut self, changes: Vec<FileChange>) -> CycleReport {
        let mut report = CycleReport::default();

        for change in &changes {
            match self.dispatch(change).await {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    error!("{}", e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Dispatch a single change
    pub async fn dispatch(&mut self, change: &FileChange) -> SyncResult<Outcome> {
        let Some(id) = change.id() else {
            return Ok(Outcome::Skipped(SkipReason::NoIdentifier));
        };

        match change.change_type {
            ChangeType::Created => self.deploy(id, &change.path).await,
            ChangeType::Deleted => self.undeploy(id).await,
        }
    }

    async fn deploy(&mut self, id: ModelId, path: &Path) -> SyncResult<Outcome> {
        if !is_regular_file(path).await {
            debug!("Skipping {:?}: no longer a regular file", path);
            return Ok(Outcome::Skipped(SkipReason::NotAFile));
        }

        info!("Deploying model {} from {:?} to {}", id, path, self.collection.target(&id));
        self.collection
            .deploy(&id, path)
            .await
            .map_err(|e| SyncError::remote(RemoteOperation::Deploy, id.as_str(), e))?;

        info!("Deployed model {}", id);
        self.tracked.insert(id.clone());
        Ok(Outcome::Deployed(id))
    }

    async fn undeploy(&mut self, id: ModelId) -> SyncResult<Outcome> {
        // Removed before the call and not restored on failure
        if !self.tracked.remove(&id) {
            debug!("Model {} is not tracked; nothing to undeploy", id);
            return Ok(Outcome::Skipped(SkipReason::NotTracked));
        }

        info!("Undeploying model {} at {}", id, self.collection.target(&id));
        self.collection
            .undeploy(&id)
            .await
            .map_err(|e| SyncError::remote(RemoteOperation::Undeploy, id.as_str(), e))?;

        info!("Undeployed model {}", id);
        Ok(Outcome::Undeployed(id))
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}
