//! Remote model collection
//!
//! The synchronizer only needs two operations from the collection: put a
//! model file under an identifier and remove it again. Both must tolerate
//! repeats, since a restart redeploys every file still present.

pub mod http;
pub mod memory;

pub use http::HttpCollection;
pub use memory::{RecordedCall, RecordingCollection};

use crate::error::CollectionError;
use crate::identifier::ModelId;
use async_trait::async_trait;
use std::path::Path;

/// A collection of deployed models addressed by identifier
#[async_trait]
pub trait ModelCollection: Send + Sync {
    /// Address of the model resource for `id`, used in logs
    fn target(&self, id: &ModelId) -> String;

    /// Deploy (or overwrite) the model `id` from `file`
    async fn deploy(&self, id: &ModelId, file: &Path) -> Result<(), CollectionError>;

    /// Remove the model `id`
    async fn undeploy(&self, id: &ModelId) -> Result<(), CollectionError>;
}
