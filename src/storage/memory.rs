//! In-memory namespace tree
//!
//! Built up front with `add_file` / `add_dir`, read-only once shared.
//! Listing of chosen paths can be made to fail, which lets tests drive
//! the storage error paths.

use crate::error::{StorageError, StorageResult};
use crate::storage::glob::{self, GlobPattern, NamespaceTree};
use crate::storage::types::{parent_path, Entry};
use crate::storage::StorageClient;
use std::collections::{BTreeMap, HashSet};

/// In-memory storage client
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    /// Every entry keyed by absolute path, root included
    entries: BTreeMap<String, Entry>,

    /// Default replication for files added without one
    default_replication: u16,

    /// Directories whose listing fails
    failing: HashSet<String>,
}

impl MemoryStorage {
    /// Create an empty tree containing only the root directory
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("/".to_string(), Entry::dir("/"));
        Self {
            entries,
            default_replication: 3,
            failing: HashSet::new(),
        }
    }

    /// Set the replication factor given to files added afterwards
    pub fn with_default_replication(mut self, replication: u16) -> Self {
        self.default_replication = replication;
        self
    }

    /// Add a directory, creating missing parents
    pub fn add_dir(&mut self, path: &str) -> &mut Self {
        let path = normalize(path);
        self.ensure_parents(&path);
        self.entries
            .entry(path.clone())
            .or_insert_with(|| Entry::dir(path));
        self
    }

    /// Add a file, creating missing parents
    pub fn add_file(&mut self, path: &str, size: u64) -> &mut Self {
        let replication = self.default_replication;
        self.add_file_with_replication(path, size, replication)
    }

    /// Add a file with an explicit replication factor
    pub fn add_file_with_replication(&mut self, path: &str, size: u64, replication: u16) -> &mut Self {
        let path = normalize(path);
        self.ensure_parents(&path);
        self.entries
            .insert(path.clone(), Entry::file(path, size, replication));
        self
    }

    /// Make listing `path` fail with a storage error
    pub fn fail_listing(&mut self, path: &str) -> &mut Self {
        self.failing.insert(normalize(path));
        self
    }

    /// Number of files in the tree
    pub fn file_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_file()).count()
    }

    fn ensure_parents(&mut self, path: &str) {
        let mut current = parent_path(path);
        while let Some(dir) = current {
            if self.entries.contains_key(dir) {
                break;
            }
            self.entries.insert(dir.to_string(), Entry::dir(dir));
            current = parent_path(dir);
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl NamespaceTree for MemoryStorage {
    fn lookup(&self, path: &str) -> StorageResult<Option<Entry>> {
        Ok(self.entries.get(path).cloned())
    }

    fn read_dir(&self, path: &str) -> StorageResult<Vec<Entry>> {
        if self.failing.contains(path) {
            return Err(StorageError::ListFailed {
                path: path.to_string(),
                reason: "listing disabled for this path".into(),
            });
        }

        match self.entries.get(path) {
            Some(entry) if entry.is_dir() => {}
            Some(_) => {
                return Err(StorageError::ListFailed {
                    path: path.to_string(),
                    reason: "not a directory".into(),
                })
            }
            None => {
                return Err(StorageError::NotFound {
                    path: path.to_string(),
                })
            }
        }

        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };

        // BTreeMap order keeps children sorted by path
        let children = self
            .entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(key, _)| key.len() > prefix.len() && !key[prefix.len()..].contains('/'))
            .map(|(_, entry)| entry.clone())
            .collect();

        Ok(children)
    }
}

impl StorageClient for MemoryStorage {
    fn resolve_glob(&self, pattern: &str) -> StorageResult<Vec<Entry>> {
        let glob = GlobPattern::new(pattern)?;
        glob::resolve(self, &glob)
    }

    fn list_children(&self, dir: &Entry) -> StorageResult<Vec<Entry>> {
        self.read_dir(&dir.path)
    }

    fn stat(&self, path: &str) -> StorageResult<Option<Entry>> {
        self.lookup(path)
    }

    fn describe(&self) -> String {
        format!("mem:// ({} entries)", self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage
            .add_file("/data/a1", 10)
            .add_file("/data/a2", 20)
            .add_file("/data/a3/x", 30)
            .add_file("/data/a3/y", 40)
            .add_file("/data/b.log", 50);
        storage
    }

    #[test]
    fn test_parents_are_created() {
        let storage = sample();
        assert!(storage.stat("/data").unwrap().unwrap().is_dir());
        assert!(storage.stat("/data/a3").unwrap().unwrap().is_dir());
        assert_eq!(storage.file_count(), 5);
    }

    #[test]
    fn test_list_immediate_children_only() {
        let storage = sample();
        let children: Vec<String> = storage
            .read_dir("/data")
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            children,
            vec!["/data/a1", "/data/a2", "/data/a3", "/data/b.log"]
        );
    }

    #[test]
    fn test_resolve_glob() {
        let storage = sample();
        let paths: Vec<String> = storage
            .resolve_glob("/data/a*")
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["/data/a1", "/data/a2", "/data/a3"]);

        assert!(storage.resolve_glob("/nothing/*").unwrap().is_empty());
        assert_eq!(storage.resolve_glob("/data/b.log").unwrap().len(), 1);
    }

    fn resolved(storage: &MemoryStorage, pattern: &str) -> Vec<String> {
        storage
            .resolve_glob(pattern)
            .unwrap()
            .into_iter()
            .map(|e| e.path)
            .collect()
    }

    #[test]
    fn test_resolve_question_mark() {
        let mut storage = sample();
        storage.add_file("/data/a10", 1);
        assert_eq!(
            resolved(&storage, "/data/a?"),
            vec!["/data/a1", "/data/a2", "/data/a3"]
        );
        assert_eq!(resolved(&storage, "/data/a??"), vec!["/data/a10"]);
        assert_eq!(resolved(&storage, "/data/a3/?"), vec!["/data/a3/x", "/data/a3/y"]);
    }

    #[test]
    fn test_resolve_character_classes() {
        let storage = sample();
        assert_eq!(resolved(&storage, "/data/a[!1]"), vec!["/data/a2", "/data/a3"]);
        assert_eq!(resolved(&storage, "/data/a[13]"), vec!["/data/a1", "/data/a3"]);
        assert_eq!(resolved(&storage, "/data/a3/[x-z]"), vec!["/data/a3/x", "/data/a3/y"]);
        assert!(resolved(&storage, "/data/a[!1-3]").is_empty());
    }

    #[test]
    fn test_resolve_escaped_star_is_literal() {
        let mut storage = sample();
        storage.add_file("/data/a*", 5);
        assert_eq!(resolved(&storage, r"/data/a\*"), vec!["/data/a*"]);
        assert_eq!(resolved(&storage, "/data/a*").len(), 4);
    }

    #[test]
    fn test_overlapping_alternatives_are_deduplicated() {
        let storage = sample();
        let matches = storage.resolve_glob("/data/{a1,a?}").unwrap();
        let paths: Vec<&str> = matches.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/data/a1", "/data/a2", "/data/a3"]);
    }

    #[test]
    fn test_failing_listing() {
        let mut storage = sample();
        storage.fail_listing("/data/a3");

        let dir = storage.stat("/data/a3").unwrap().unwrap();
        assert!(matches!(
            storage.list_children(&dir),
            Err(StorageError::ListFailed { .. })
        ));
        assert!(matches!(
            storage.resolve_glob("/data/a3/*"),
            Err(StorageError::GlobFailed { .. })
        ));
    }
}
