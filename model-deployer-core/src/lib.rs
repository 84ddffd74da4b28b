//! Core functionality for model-deployer
//!
//! Keeps a remote model collection in step with a directory of model files:
//! files that appear are deployed under the name before their first dot,
//! files that disappear are undeployed.

pub mod collection;
pub mod config;
pub mod error;
pub mod identifier;
pub mod monitor;
pub mod registry;
pub mod sync;

pub use collection::{HttpCollection, ModelCollection, RecordingCollection};
pub use config::{DeployerConfig, WatchMode};
pub use error::{CollectionError, SyncError, SyncResult};
pub use identifier::ModelId;
pub use registry::TrackedSet;
pub use sync::{DirectorySync, SyncControl, SyncState};
