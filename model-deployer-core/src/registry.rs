//! Registry of model identifiers believed to be deployed

use crate::identifier::ModelId;
use std::collections::BTreeSet;

/// Identifiers whose deploy succeeded and that have not been undeployed since.
///
/// Owned by the sync task; nothing else writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedSet {
    ids: BTreeSet<ModelId>,
}

impl TrackedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `id`. Returns `false` if it was already tracked.
    pub fn insert(&mut self, id: ModelId) -> bool {
        self.ids.insert(id)
    }

    /// Stop tracking `id`. Returns `false` if it was not tracked.
    pub fn remove(&mut self, id: &ModelId) -> bool {
        self.ids.remove(id)
    }

    pub fn contains(&self, id: &ModelId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Tracked identifiers in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &ModelId> {
        self.ids.iter()
    }

    /// Tracked identifiers as plain strings, sorted
    pub fn names(&self) -> Vec<String> {
        self.ids.iter().map(|id| id.to_string()).collect()
    }
}

impl FromIterator<ModelId> for TrackedSet {
    fn from_iter<I: IntoIterator<Item = ModelId>>(iter: I) -> Self {
        Self { ids: iter.into_iter().collect() }
    }
}
