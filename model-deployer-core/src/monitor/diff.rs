//! Classifies snapshots into Create/Delete changes

use super::{FileChange, Snapshot};
use crate::identifier::ModelId;
use crate::registry::TrackedSet;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// First cycle: every file with an identifier is a create, whatever is tracked.
pub fn initial_changes(snapshot: &Snapshot) -> Vec<FileChange> {
    snapshot
        .iter()
        .filter(|entry| entry.id().is_some())
        .map(|entry| FileChange::created(&entry.path))
        .collect()
}

/// Later cycles.
///
/// Creates: every file whose identifier is not tracked, in snapshot order.
/// Files sharing an identifier each get their own create.
///
/// Deletes: every identifier in `previous` that no file in `snapshot`
/// produces any more, addressed by the path it was last seen under.
pub fn poll_changes(
    previous: &BTreeMap<ModelId, PathBuf>,
    snapshot: &Snapshot,
    tracked: &TrackedSet,
) -> Vec<FileChange> {
    let mut changes: Vec<FileChange> = snapshot
        .iter()
        .filter(|entry| entry.id().is_some_and(|id| !tracked.contains(&id)))
        .map(|entry| FileChange::created(&entry.path))
        .collect();

    let current = snapshot.identifiers();
    changes.extend(
        previous
            .iter()
            .filter(|(id, _)| !current.contains_key(*id))
            .map(|(_, path)| FileChange::deleted(path)),
    );

    changes
}

/// Full comparison of a snapshot against the tracked set, for sources that
/// cannot rely on a previous snapshot.
///
/// Creates: as in [`poll_changes`]. Deletes: every tracked identifier that
/// no file produces any more, addressed as `dir/<id>`.
pub fn reconcile_changes(dir: &Path, snapshot: &Snapshot, tracked: &TrackedSet) -> Vec<FileChange> {
    let current = snapshot.identifiers();
    let mut changes: Vec<FileChange> = snapshot
        .iter()
        .filter(|entry| entry.id().is_some_and(|id| !tracked.contains(&id)))
        .map(|entry| FileChange::created(&entry.path))
        .collect();

    changes.extend(
        tracked
            .iter()
            .filter(|id| !current.contains_key(*id))
            .map(|id| FileChange::deleted(dir.join(id.as_str()))),
    );

    changes
}
