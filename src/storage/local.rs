//! Local filesystem storage client
//!
//! Maps a `file://` namespace onto a directory on disk. Namespace path `/`
//! is the root directory; symlinks are reported as such and never followed.

use crate::error::{StorageError, StorageResult};
use crate::storage::glob::{self, GlobPattern, NamespaceTree};
use crate::storage::types::{join_path, Entry, EntryType};
use crate::storage::StorageClient;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{trace, warn};

/// Replication reported for local files
pub const LOCAL_REPLICATION: u16 = 1;

/// Storage client backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    /// Create a client rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        let display = root.display().to_string();
        let meta = fs::metadata(&root).map_err(|e| StorageError::from_io(&display, &e))?;
        if !meta.is_dir() {
            return Err(StorageError::ListFailed {
                path: display,
                reason: "namespace root is not a directory".into(),
            });
        }
        Ok(Self { root })
    }

    /// Root directory on disk
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a namespace path onto disk, refusing anything that could leave the root
    fn local_path(&self, path: &str) -> StorageResult<PathBuf> {
        let mut local = self.root.clone();
        for name in path.split('/').filter(|s| !s.is_empty()) {
            if name == "." || name == ".." {
                return Err(StorageError::InvalidPath {
                    path: path.to_string(),
                    reason: format!("'{}' components are not allowed", name),
                });
            }
            local.push(name);
        }
        Ok(local)
    }

    fn entry_from_metadata(path: String, meta: &fs::Metadata) -> Entry {
        let entry_type = EntryType::from_file_type(&meta.file_type());
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64);

        Entry {
            path,
            entry_type,
            size: if entry_type.is_file() { meta.len() } else { 0 },
            replication: if entry_type.is_file() { LOCAL_REPLICATION } else { 0 },
            mtime,
        }
    }
}

impl NamespaceTree for LocalStorage {
    fn lookup(&self, path: &str) -> StorageResult<Option<Entry>> {
        match fs::symlink_metadata(self.local_path(path)?) {
            Ok(meta) => Ok(Some(Self::entry_from_metadata(path.to_string(), &meta))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_io(path, &e)),
        }
    }

    fn read_dir(&self, path: &str) -> StorageResult<Vec<Entry>> {
        let reader =
            fs::read_dir(self.local_path(path)?).map_err(|e| StorageError::from_io(path, &e))?;

        let mut children = Vec::new();
        for dirent in reader {
            let dirent = dirent.map_err(|e| StorageError::from_io(path, &e))?;
            let name = match dirent.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(path = %path, name = ?raw, "Skipping non-UTF-8 entry");
                    continue;
                }
            };
            let child_path = join_path(path, &name);
            let meta = dirent
                .metadata()
                .map_err(|e| StorageError::from_io(&child_path, &e))?;
            children.push(Self::entry_from_metadata(child_path, &meta));
        }

        children.sort_by(|a, b| a.path.cmp(&b.path));
        trace!(path = %path, children = children.len(), "Listed directory");
        Ok(children)
    }
}

impl StorageClient for LocalStorage {
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
        format!("file://{}", self.root.display())
    }
}
