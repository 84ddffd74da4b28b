//! Change detection from native filesystem events using notify crate

use super::{ChangeSource, ChangeType, FileChange, Scanner, diff};
use crate::error::{SyncError, SyncResult};
use crate::registry::TrackedSet;
use async_trait::async_trait;
use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Native event source for the model directory.
///
/// The notify callback runs on the watcher's own thread; it only forwards
/// changes into a channel drained by the sync task.
pub struct NotifySource {
    scanner: Scanner,
    settle: Duration,
    rx: mpsc::UnboundedReceiver<FileChange>,
    pending: Vec<FileChange>,
    closed: bool,
    // Dropping the watcher stops event delivery
    _watcher: RecommendedWatcher,
}

impl NotifySource {
    /// Start watching `dir` (non-recursively). Events are held back for
    /// `settle` after the first one arrives so a file being copied in has
    /// time to land.
    pub fn new(dir: impl Into<PathBuf>, settle: Duration) -> SyncResult<Self> {
        let dir = dir.into();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                for change in process_event(event) {
                    if let Err(e) = tx.send(change) {
                        error!("Failed to send change event: {}", e);
                    }
                }
            }
            Err(e) => error!("Watch error: {:?}", e),
        })
        .map_err(|e| SyncError::watch(format!("failed to create watcher: {}", e)))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| SyncError::watch(format!("failed to watch {:?}: {}", dir, e)))?;
        info!("Watching path: {:?} (recursive: false)", dir);

        Ok(Self { scanner: Scanner::new(dir), settle, rx, pending: Vec::new(), closed: false, _watcher: watcher })
    }

    pub fn dir(&self) -> &Path {
        self.scanner.dir()
    }

    fn drain(&mut self) {
        while let Ok(change) = self.rx.try_recv() {
            self.pending.push(change);
        }
    }
}

#[async_trait]
impl ChangeSource for NotifySource {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn initial_scan(&mut self) -> SyncResult<Vec<FileChange>> {
        // Anything queued so far is covered by the scan
        self.drain();
        self.pending.clear();

        let snapshot = self.scanner.scan().await?;
        Ok(diff::initial_changes(&snapshot))
    }

    async fn wait_for_changes(&mut self) {
        if self.pending.is_empty() {
            match self.rx.recv().await {
                Some(change) => self.pending.push(change),
                None => {
                    if !self.closed {
                        warn!("Event channel for {:?} closed; no further changes will be seen", self.dir());
                        self.closed = true;
                    }
                    std::future::pending::<()>().await;
                }
            }
        }

        sleep(self.settle).await;
    }

    async fn collect_changes(&mut self, tracked: &TrackedSet) -> SyncResult<Vec<FileChange>> {
        self.drain();

        if self.pending.is_empty() {
            // Woken by a rescan rather than an event
            let snapshot = self.scanner.scan().await?;
            let changes = diff::reconcile_changes(self.dir(), &snapshot, tracked);
            debug!("Rescan of {:?} found {} changes", self.dir(), changes.len());
            return Ok(changes);
        }

        if self.pending.iter().any(|c| c.change_type == ChangeType::Deleted) {
            // A removed path cannot be stat'ed, so check whether its id is still produced by a file.
            // On failure the events stay queued for the next cycle.
            let present = self.scanner.scan().await?.identifiers();
            self.pending.retain(|change| match (change.change_type, change.id()) {
                (ChangeType::Deleted, Some(id)) if present.contains_key(&id) => {
                    debug!("Ignoring removal of {:?}: model {} is still present", change.path, id);
                    false
                }
                _ => true,
            });
        }

        let changes = std::mem::take(&mut self.pending);
        debug!("Collected {} native events for {:?}", changes.len(), self.dir());
        Ok(changes)
    }
}

/// Translate a notify event into the changes the synchronizer cares about
fn process_event(event: Event) -> Vec<FileChange> {
    let paths = event.paths;

    match event.kind {
        EventKind::Create(_) => paths.into_iter().map(FileChange::created).collect(),
        EventKind::Remove(RemoveKind::Folder) => Vec::new(),
        EventKind::Remove(_) => paths.into_iter().map(FileChange::deleted).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => paths.into_iter().map(FileChange::deleted).collect(),
            RenameMode::To => paths.into_iter().map(FileChange::created).collect(),
            RenameMode::Both => {
                let mut paths = paths.into_iter();
                let mut changes = Vec::new();
                if let Some(from) = paths.next() {
                    changes.push(FileChange::deleted(from));
                }
                if let Some(to) = paths.next() {
                    changes.push(FileChange::created(to));
                }
                changes
            }
            // Platforms that cannot tell which side of the rename this is
            _ => paths
                .into_iter()
                .map(|p| if p.exists() { FileChange::created(p) } else { FileChange::deleted(p) })
                .collect(),
        },
        _ => Vec::new(),
    }
}
