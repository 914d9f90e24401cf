//! Persisted snapshot layout for the VFS layer.
//!
//! The whole namespace is serialized under a single storage key as
//! `{"files": [[path, FileRecord], ...], "directories": [[path, DirectoryRecord], ...], "nextInode": n}`.

use serde::{Deserialize, Serialize};

use crate::core::{DirectoryRecord, FileRecord, VfsError};

/// Default storage key for the filesystem snapshot.
pub const DEFAULT_FILESYSTEM_KEY: &str = "webos_filesystem";

/// First inode handed out on a fresh filesystem.
pub const FIRST_INODE: u64 = 1;

fn first_inode() -> u64 {
    FIRST_INODE
}

/// Serialized form of the entire namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// File table as (path, record) pairs
    #[serde(default)]
    pub files: Vec<(String, FileRecord)>,

    /// Directory table as (path, record) pairs
    #[serde(default)]
    pub directories: Vec<(String, DirectoryRecord)>,

    /// Next inode to allocate
    #[serde(default = "first_inode")]
    pub next_inode: u64,
}

impl Snapshot {
    /// Encode to the JSON text stored by the HAL.
    pub fn to_json(&self) -> Result<String, VfsError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from stored JSON text.
    pub fn from_json(data: &str) -> Result<Self, VfsError> {
        Ok(serde_json::from_str(data)?)
    }

    /// Smallest inode value that cannot collide with any stored record.
    ///
    /// Guards against snapshots whose counter lags behind their records.
    pub fn safe_next_inode(&self) -> u64 {
        let max_file = self.files.iter().map(|(_, f)| f.inode).max().unwrap_or(0);
        let max_dir = self.directories.iter().map(|(_, d)| d.inode).max().unwrap_or(0);
        self.next_inode.max(max_file.max(max_dir) + 1)
    }
}

/// VFS configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VfsConfig {
    /// Storage key the snapshot is written under
    pub storage_key: String,

    /// Reject `write_file` when the parent directory does not exist.
    ///
    /// When false the file is still created but is not registered in any
    /// directory's child set.
    pub require_parent: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            storage_key: String::from(DEFAULT_FILESYSTEM_KEY),
            require_parent: true,
        }
    }
}
