//! Error types for hadaps-balancer
//!
//! This module defines the error hierarchy that covers:
//! - Storage namespace errors (glob resolution, directory listing)
//! - Per-file balancing failures
//! - Configuration and CLI errors
//! - Worker pool errors
//!
//! Storage errors abort a run before anything is dispatched. Operation
//! failures never leave the scheduler: they are logged, recorded, and the
//! run moves on.

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the balancer
#[derive(Error, Debug)]
pub enum BalancerError {
    /// A required construction parameter was missing or invalid
    #[error("Invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// Storage namespace errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker pool errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Interrupted while waiting for a completion
    #[error("Operation interrupted while waiting for balancing results")]
    Interrupted,

    /// Worker pool did not terminate within the grace period
    #[error("Worker pool did not shut down within {grace:?}")]
    PoolShutdown { grace: Duration },
}

/// Storage namespace errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Glob expression could not be compiled
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Glob resolution failed
    #[error("Failed to resolve pattern '{pattern}': {reason}")]
    GlobFailed { pattern: String, reason: String },

    /// Directory listing failed
    #[error("Failed to list directory '{path}': {reason}")]
    ListFailed { path: String, reason: String },

    /// Permission denied
    #[error("Permission denied: '{path}'")]
    PermissionDenied { path: String },

    /// Path not found
    #[error("Path not found: '{path}'")]
    NotFound { path: String },

    /// Path is not a plain absolute namespace path
    #[error("Invalid namespace path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Namespace scheme has no storage client
    #[error("Unsupported namespace scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },
}

impl StorageError {
    /// Map an I/O error on `path` to the closest storage error
    pub fn from_io(path: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound { path: path.to_string() },
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied {
                path: path.to_string(),
            },
            _ => StorageError::ListFailed {
                path: path.to_string(),
                reason: err.to_string(),
            },
        }
    }
}

/// Failure of a single balancing operation
///
/// Never aborts a run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationFailure {
    /// The operation reported a failure
    #[error("Balancing '{path}' failed: {reason}")]
    Failed { path: String, reason: String },

    /// The operation panicked
    #[error("Balancing '{path}' panicked: {message}")]
    Panicked { path: String, message: String },
}

impl OperationFailure {
    /// Path of the file whose operation failed
    pub fn path(&self) -> &str {
        match self {
            OperationFailure::Failed { path, .. } => path,
            OperationFailure::Panicked { path, .. } => path,
        }
    }
}

/// Configuration and CLI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid pattern argument
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Invalid replication factor
    #[error("Invalid replication factor '{value}': must be between 1 and {max}")]
    InvalidReplication { value: String, max: u16 },

    /// Invalid generation descriptor
    #[error("Invalid generation '{value}': {reason}")]
    InvalidGeneration { value: String, reason: String },

    /// Invalid namespace URI
    #[error("Invalid namespace URI '{uri}': {reason}")]
    InvalidNamespace { uri: String, reason: String },

    /// Invalid interruption poll interval
    #[error("Invalid poll interval: {0}")]
    InvalidPollInterval(String),
}

/// Worker pool errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker thread could not be spawned
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Job queue closed while submitting
    #[error("Failed to submit work item: job queue closed")]
    QueueClosed,

    /// All workers are gone while results were still expected
    #[error("Completion channel closed unexpectedly")]
    CompletionChannelClosed,
}

/// Result type alias for BalancerError
pub type Result<T> = std::result::Result<T, BalancerError>;

/// Result type alias for StorageError
pub type StorageResult<T> = std::result::Result<T, StorageError>;
