//! Model directory monitoring and change detection
//!
//! Two interchangeable change sources feed the sync loop:
//! - [`PollingSource`] snapshots the directory on a fixed interval and diffs
//!   consecutive snapshots
//! - [`NotifySource`] listens for native filesystem events and funnels them
//!   through a channel into the same loop
//!
//! Both report presence and absence only; content edits are not tracked.

pub mod diff;
pub mod poller;
pub mod scanner;
pub mod watcher;

pub use poller::PollingSource;
pub use scanner::{DirectoryEntry, Scanner, Snapshot};
pub use watcher::NotifySource;

use crate::error::SyncResult;
use crate::identifier::ModelId;
use crate::registry::TrackedSet;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Represents a detected change in the model directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub change_type: ChangeType,
}

/// Types of changes the synchronizer acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Created,
    Deleted,
}

impl FileChange {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), change_type: ChangeType::Created }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), change_type: ChangeType::Deleted }
    }

    /// Model identifier of the changed file, if it has one
    pub fn id(&self) -> Option<ModelId> {
        ModelId::from_path(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Produces the Create/Delete changes observed since the previous call.
///
/// Implementations are driven by a single task; `wait_for_changes` must be
/// cancel safe since the loop races it against its control channel.
#[async_trait]
pub trait ChangeSource: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Report every file currently present as created
    async fn initial_scan(&mut self) -> SyncResult<Vec<FileChange>>;

    /// Block until the next batch of changes may be collected
    async fn wait_for_changes(&mut self);

    /// Changes since the last observation, judged against what is tracked
    async fn collect_changes(&mut self, tracked: &TrackedSet) -> SyncResult<Vec<FileChange>>;
}
