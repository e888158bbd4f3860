//! Storage namespace access
//!
//! The balancer needs little from a namespace: resolve a glob to its
//! matching entries, list the children of a directory, and look up a
//! single path. All of it is expressed by [`StorageClient`]; discovery and
//! every balancing operation share one client through an `Arc`.
//!
//! # Clients
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  StorageClient                       │
//! │  - resolve_glob(pattern) -> entries (sorted)        │
//! │  - list_children(dir)    -> entries (sorted)        │
//! │  - stat(path)            -> entry, if present       │
//! └───────────────┬─────────────────────┬───────────────┘
//!                 │                     │
//!          ┌──────▼──────┐       ┌──────▼──────┐
//!          │LocalStorage │       │MemoryStorage│
//!          │  file://    │       │  tests      │
//!          └─────────────┘       └─────────────┘
//! ```

pub mod glob;
pub mod local;
pub mod memory;
pub mod types;

pub use glob::GlobPattern;
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use types::{Entry, EntryType};

use crate::config::{NamespaceUri, Scheme};
use crate::error::{StorageError, StorageResult};
use std::sync::Arc;

/// Read access to a hierarchical storage namespace
///
/// Implementations must tolerate concurrent use from discovery and from
/// every worker thread.
pub trait StorageClient: Send + Sync {
    /// Resolve a glob pattern to the entries it matches, sorted by path
    ///
    /// A pattern that matches nothing returns an empty list.
    fn resolve_glob(&self, pattern: &str) -> StorageResult<Vec<Entry>>;

    /// List the immediate children of a directory entry, sorted by path
    fn list_children(&self, dir: &Entry) -> StorageResult<Vec<Entry>>;

    /// Look up a single path, `None` if it does not exist
    fn stat(&self, path: &str) -> StorageResult<Option<Entry>>;

    /// Human-readable description for logs
    fn describe(&self) -> String {
        "storage".to_string()
    }
}

/// Open the storage client for a namespace URI
pub fn open(uri: &NamespaceUri) -> StorageResult<Arc<dyn StorageClient>> {
    match uri.scheme {
        Scheme::File => Ok(Arc::new(LocalStorage::new(&uri.path)?)),
        // mem:// trees only exist when built in code as a MemoryStorage
        Scheme::Hdfs | Scheme::Memory => Err(StorageError::UnsupportedScheme {
            scheme: uri.scheme.as_str().to_string(),
        }),
    }
}
