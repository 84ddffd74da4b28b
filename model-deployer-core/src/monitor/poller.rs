//! Change detection by periodic snapshot diffing

use super::{ChangeSource, FileChange, Scanner, diff};
use crate::error::SyncResult;
use crate::identifier::ModelId;
use crate::registry::TrackedSet;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Polls the model directory and diffs each snapshot against the last good one
pub struct PollingSource {
    scanner: Scanner,
    interval: Duration,
    /// Identifiers seen by the last successful scan
    previous: BTreeMap<ModelId, PathBuf>,
}

impl PollingSource {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self { scanner: Scanner::new(dir), interval, previous: BTreeMap::new() }
    }
}

#[async_trait]
impl ChangeSource for PollingSource {
    fn name(&self) -> &'static str {
        "poll"
    }

    async fn initial_scan(&mut self) -> SyncResult<Vec<FileChange>> {
        let snapshot = self.scanner.scan().await?;
        self.previous = snapshot.identifiers();
        Ok(diff::initial_changes(&snapshot))
    }

    async fn wait_for_changes(&mut self) {
        sleep(self.interval).await;
    }

    async fn collect_changes(&mut self, tracked: &TrackedSet) -> SyncResult<Vec<FileChange>> {
        // A failed scan keeps the previous snapshot so files are not reported as deleted
        let snapshot = self.scanner.scan().await?;
        let changes = diff::poll_changes(&self.previous, &snapshot, tracked);
        self.previous = snapshot.identifiers();

        debug!("Poll of {:?} found {} changes", self.scanner.dir(), changes.len());
        Ok(changes)
    }
}
