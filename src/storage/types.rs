//! Storage entry types
//!
//! These types represent namespace entries returned by a storage client
//! and carry the metadata a balancing operation needs.

use std::fmt;

/// Type of namespace entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntryType {
    /// Regular file
    File = 0,
    /// Directory
    Directory = 1,
    /// Symbolic link
    Symlink = 2,
    /// Anything else (devices, sockets, pipes)
    Other = 255,
}

impl EntryType {
    /// Convert from std file type metadata
    pub fn from_file_type(ft: &std::fs::FileType) -> Self {
        if ft.is_file() {
            EntryType::File
        } else if ft.is_dir() {
            EntryType::Directory
        } else if ft.is_symlink() {
            EntryType::Symlink
        } else {
            EntryType::Other
        }
    }

    /// Check if this is a regular file
    pub fn is_file(&self) -> bool {
        *self == EntryType::File
    }

    /// Check if this is a directory
    pub fn is_dir(&self) -> bool {
        *self == EntryType::Directory
    }
}

/// A resolved namespace entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Absolute path within the namespace (always starts with `/`)
    pub path: String,

    /// Entry type
    pub entry_type: EntryType,

    /// Size in bytes (0 for directories)
    pub size: u64,

    /// Current replication factor
    pub replication: u16,

    /// Last modification time (Unix timestamp)
    pub mtime: Option<i64>,
}

impl Entry {
    /// Create a file entry
    pub fn file(path: impl Into<String>, size: u64, replication: u16) -> Self {
        Self {
            path: path.into(),
            entry_type: EntryType::File,
            size,
            replication,
            mtime: None,
        }
    }

    /// Create a directory entry
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entry_type: EntryType::Directory,
            size: 0,
            replication: 0,
            mtime: None,
        }
    }

    /// Final path component (empty for the root)
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    pub fn is_file(&self) -> bool {
        self.entry_type.is_file()
    }

    pub fn is_dir(&self) -> bool {
        self.entry_type.is_dir()
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Join a namespace directory path and a child name
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent of a namespace path (`None` for the root)
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" || path.is_empty() {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}
