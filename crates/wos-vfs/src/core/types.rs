//! Core types for the VFS layer.
//!
//! Defines the file and directory records kept in the namespace maps and the
//! entry type returned by directory listings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::path::filename;

/// A directory in the namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRecord {
    /// Unique inode number
    pub inode: u64,

    /// Canonical path (primary key)
    pub path: String,

    /// Last path segment (`/` for the root)
    pub name: String,

    /// Creation timestamp (ms since epoch)
    pub created: u64,

    /// Last modification timestamp
    pub modified: u64,

    /// Paths of the files registered in this directory
    #[serde(default)]
    pub items: BTreeSet<String>,
}

impl DirectoryRecord {
    /// Create a new, empty directory record.
    pub fn new(inode: u64, path: String, now: u64) -> Self {
        let name = String::from(filename(&path));
        Self {
            inode,
            path,
            name,
            created: now,
            modified: now,
            items: BTreeSet::new(),
        }
    }
}

/// A file in the namespace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique inode number (stable across overwrites of the same path)
    pub inode: u64,

    /// Canonical path (primary key)
    pub path: String,

    /// Last path segment
    pub name: String,

    /// File payload
    pub content: String,

    /// Size of `content` in bytes
    pub size: u64,

    /// Creation timestamp (ms since epoch)
    pub created: u64,

    /// Last modification timestamp
    pub modified: u64,

    /// Last read timestamp
    #[serde(default)]
    pub accessed: u64,
}

impl FileRecord {
    /// Create a new file record.
    pub fn new(inode: u64, path: String, content: String, now: u64) -> Self {
        let name = String::from(filename(&path));
        Self {
            inode,
            path,
            name,
            size: content.len() as u64,
            content,
            created: now,
            modified: now,
            accessed: now,
        }
    }

    /// Replace the content in place, keeping identity and creation time.
    pub fn overwrite(&mut self, content: String, now: u64) {
        self.size = content.len() as u64;
        self.content = content;
        self.modified = now;
    }
}

/// Directory entry returned by `list_directory`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name
    pub name: String,

    /// Full path
    pub path: String,

    /// Inode number
    pub inode: u64,

    /// Is this a directory?
    pub is_directory: bool,

    /// File size (0 for directories)
    pub size: u64,

    /// Last modified timestamp
    pub modified: u64,
}

impl From<&FileRecord> for DirEntry {
    fn from(file: &FileRecord) -> Self {
        Self {
            name: file.name.clone(),
            path: file.path.clone(),
            inode: file.inode,
            is_directory: false,
            size: file.size,
            modified: file.modified,
        }
    }
}

impl From<&DirectoryRecord> for DirEntry {
    fn from(dir: &DirectoryRecord) -> Self {
        Self {
            name: dir.name.clone(),
            path: dir.path.clone(),
            inode: dir.inode,
            is_directory: true,
            size: 0,
            modified: dir.modified,
        }
    }
}

/// Aggregate filesystem statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsStats {
    /// Number of files
    pub total_files: u64,

    /// Number of directories (including `/`)
    pub total_directories: u64,

    /// Sum of all file sizes in bytes
    pub total_size: u64,
}
