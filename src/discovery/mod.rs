//! Discovery of files to balance
//!
//! Each pattern is resolved against the storage client and every matched
//! directory is flattened into the files beneath it. A pattern's files are
//! sorted as soon as its expansion finishes; patterns keep the order the
//! caller gave them.
//!
//! Discovery runs on the calling thread. Any storage failure aborts it, so
//! a run never dispatches a partially discovered set.

mod work_item;

pub use work_item::WorkItem;

use crate::config::PatternConfig;
use crate::error::StorageResult;
use crate::storage::{Entry, StorageClient};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Expands patterns into sorted work items
pub struct Discovery {
    storage: Arc<dyn StorageClient>,
}

impl Discovery {
    /// Create a discovery over a storage client
    pub fn new(storage: Arc<dyn StorageClient>) -> Self {
        Self { storage }
    }

    /// Expand every pattern, in order, into work items
    ///
    /// The result holds each pattern's files sorted, concatenated in
    /// pattern order. It is not re-sorted as a whole.
    pub fn discover(&self, patterns: &[PatternConfig]) -> StorageResult<Vec<WorkItem>> {
        let mut items = Vec::new();
        let mut seq = 0u64;

        for (index, pattern) in patterns.iter().enumerate() {
            let matches = self.storage.resolve_glob(&pattern.pattern)?;

            if matches.is_empty() {
                info!(pattern = %pattern.pattern, "No matching files for pattern");
                continue;
            }

            let pattern = Arc::new(pattern.clone());
            let mut found = self.expand(index, &pattern, matches, &mut seq)?;
            found.sort();

            info!(
                pattern = %pattern.pattern,
                matched = found.len(),
                bytes = found.iter().map(|i| i.entry().size).sum::<u64>(),
                "Matching files for pattern"
            );
            debug!(
                pattern = %pattern.pattern,
                files = ?found.iter().map(WorkItem::path).collect::<Vec<_>>(),
                "Matched set"
            );

            items.append(&mut found);
        }

        Ok(items)
    }

    /// Flatten matched entries into file work items
    ///
    /// Uses an explicit stack so tree depth is bounded only by memory. A
    /// directory reached twice within one pattern is expanded once.
    fn expand(
        &self,
        pattern_index: usize,
        pattern: &Arc<PatternConfig>,
        matches: Vec<Entry>,
        seq: &mut u64,
    ) -> StorageResult<Vec<WorkItem>> {
        let mut items = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();

        // Reversed so entries pop in listing order
        let mut stack: Vec<Entry> = matches.into_iter().rev().collect();

        while let Some(entry) = stack.pop() {
            if entry.is_file() {
                items.push(WorkItem::new(
                    entry,
                    Arc::clone(pattern),
                    pattern_index,
                    *seq,
                    Arc::clone(&self.storage),
                ));
                *seq += 1;
            } else if entry.is_dir() {
                if !visited.insert(entry.path.clone()) {
                    trace!(path = %entry.path, "Directory already expanded");
                    continue;
                }
                let children = self.storage.list_children(&entry)?;
                trace!(path = %entry.path, children = children.len(), "Expanding directory");
                stack.extend(children.into_iter().rev());
            } else {
                debug!(path = %entry.path, entry_type = ?entry.entry_type, "Skipping non-regular entry");
            }
        }

        Ok(items)
    }
}
