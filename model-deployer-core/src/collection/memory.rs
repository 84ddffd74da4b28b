//! In-memory collection that records calls instead of sending them

use super::ModelCollection;
use crate::error::{CollectionError, RemoteOperation};
use crate::identifier::ModelId;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::info;

/// A call made against a [`RecordingCollection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: RemoteOperation,
    pub id: String,
    pub url: String,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<RecordedCall>,
    failing: HashSet<String>,
}

/// Records every deploy and undeploy, optionally failing chosen identifiers.
///
/// Backs `--dry-run` and the synchronizer tests.
#[derive(Debug)]
pub struct RecordingCollection {
    base_url: String,
    inner: Mutex<Inner>,
}

impl RecordingCollection {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), inner: Mutex::new(Inner::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call for `id` fail until [`Self::recover`] is called
    pub fn fail(&self, id: &str) {
        self.lock().failing.insert(id.to_string());
    }

    pub fn recover(&self, id: &str) {
        self.lock().failing.remove(id);
    }

    /// All calls so far, failed ones included
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    /// `(operation, id)` pairs in call order
    pub fn history(&self) -> Vec<(RemoteOperation, String)> {
        self.lock().calls.iter().map(|c| (c.operation, c.id.clone())).collect()
    }

    pub fn clear(&self) {
        self.lock().calls.clear();
    }

    fn record(&self, operation: RemoteOperation, id: &ModelId, file: Option<&Path>) -> Result<(), CollectionError> {
        let url = self.target(id);
        let mut inner = self.lock();
        inner.calls.push(RecordedCall {
            operation,
            id: id.to_string(),
            url: url.clone(),
            file: file.map(Path::to_path_buf),
        });

        if inner.failing.contains(id.as_str()) {
            return Err(CollectionError::Simulated { id: id.to_string() });
        }

        info!("Recorded {} of model {} at {}", operation, id, url);
        Ok(())
    }
}

#[async_trait]
impl ModelCollection for RecordingCollection {
    fn target(&self, id: &ModelId) -> String {
        format!("{}/{}", self.base_url, id)
    }

    async fn deploy(&self, id: &ModelId, file: &Path) -> Result<(), CollectionError> {
        tokio::fs::metadata(file)
            .await
            .map_err(|source| CollectionError::File { path: file.to_path_buf(), source })?;

        self.record(RemoteOperation::Deploy, id, Some(file))
    }

    async fn undeploy(&self, id: &ModelId) -> Result<(), CollectionError> {
        self.record(RemoteOperation::Undeploy, id, None)
    }
}
