//! Work items handed to balancing operations

use crate::config::PatternConfig;
use crate::storage::{Entry, StorageClient};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// One discovered file, paired with the pattern that matched it
///
/// Work items always refer to files. They are ordered by path, then by the
/// index of the matching pattern, then by discovery sequence number, which
/// makes the order total and reproducible for a fixed namespace.
///
/// Not `Clone`: each item is moved into exactly one operation.
pub struct WorkItem {
    entry: Entry,
    pattern: Arc<PatternConfig>,
    pattern_index: usize,
    seq: u64,
    storage: Arc<dyn StorageClient>,
}

impl WorkItem {
    /// Create a work item for a file entry
    pub fn new(
        entry: Entry,
        pattern: Arc<PatternConfig>,
        pattern_index: usize,
        seq: u64,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        debug_assert!(entry.is_file(), "work items must refer to files");
        Self {
            entry,
            pattern,
            pattern_index,
            seq,
            storage,
        }
    }

    /// The matched file
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Path of the matched file
    pub fn path(&self) -> &str {
        &self.entry.path
    }

    /// Pattern configuration that matched this file
    pub fn pattern(&self) -> &PatternConfig {
        &self.pattern
    }

    /// Position of the matching pattern in the caller's list
    pub fn pattern_index(&self) -> usize {
        self.pattern_index
    }

    /// Discovery sequence number
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Storage client the file was discovered through
    pub fn storage(&self) -> &Arc<dyn StorageClient> {
        &self.storage
    }

    fn sort_key(&self) -> (&str, usize, u64) {
        (&self.entry.path, self.pattern_index, self.seq)
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("path", &self.entry.path)
            .field("size", &self.entry.size)
            .field("pattern", &self.pattern.pattern)
            .field("pattern_index", &self.pattern_index)
            .field("seq", &self.seq)
            .finish()
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.entry.path)
    }
}
