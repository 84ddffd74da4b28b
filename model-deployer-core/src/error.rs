//! Error types for directory synchronization
//!
//! The synchronizer recovers from every one of these locally; they exist so
//! that each failure is logged with enough context to find the offending
//! file or model.

use crate::config::ConfigError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Remote operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    Deploy,
    Undeploy,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOperation::Deploy => f.write_str("deploy"),
            RemoteOperation::Undeploy => f.write_str("undeploy"),
        }
    }
}

/// Errors raised by the remote model collection
#[derive(Debug, Error)]
pub enum CollectionError {
    /// The model file could not be read for upload
    #[error("Failed to read model file {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced a response (connect failure, timeout, ...)
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The collection answered with a non-success status
    #[error("Collection returned status {status} for {url}: {message}")]
    Status { url: String, status: u16, message: String },

    /// The collection URL could not be built
    #[error("Invalid collection URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Injected failure from an in-memory collection
    #[error("Simulated failure for model '{id}'")]
    Simulated { id: String },
}

impl CollectionError {
    /// Create a status error
    pub fn status(url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Status { url: url.into(), status, message: message.into() }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into(), message: message.into() }
    }
}

/// Errors raised while scanning, diffing and dispatching
#[derive(Debug, Error)]
pub enum SyncError {
    /// The watched directory could not be listed; the whole cycle is skipped
    #[error("Failed to read directory {path:?}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single entry could not be inspected; only that entry is skipped
    #[error("Failed to access entry {path:?}: {source}")]
    EntryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A deploy or undeploy call failed
    #[error("Failed to {operation} model '{id}': {source}")]
    RemoteCall {
        operation: RemoteOperation,
        id: String,
        #[source]
        source: CollectionError,
    },

    /// A wait was cut short by a rescan request
    #[error("Wait interrupted during {phase}")]
    InterruptedWait { phase: &'static str },

    /// The native watcher could not be set up
    #[error("Watcher error: {message}")]
    Watch { message: String },

    /// The sync loop was configured with unusable values
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Create a directory read error
    pub fn directory_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryRead { path: path.into(), source }
    }

    /// Create an entry access error
    pub fn entry_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::EntryAccess { path: path.into(), source }
    }

    /// Create a remote call error
    pub fn remote(operation: RemoteOperation, id: impl Into<String>, source: CollectionError) -> Self {
        Self::RemoteCall { operation, id: id.into(), source }
    }

    /// Create a watcher error
    pub fn watch(message: impl Into<String>) -> Self {
        Self::Watch { message: message.into() }
    }

    /// Whether this error aborts the current cycle rather than a single file
    pub fn is_cycle_level(&self) -> bool {
        matches!(self, SyncError::DirectoryRead { .. })
    }
}

/// Result type for synchronizer operations
pub type SyncResult<T> = Result<T, SyncError>;
