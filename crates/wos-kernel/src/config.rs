//! Kernel configuration.

use serde::{Deserialize, Serialize};
use wos_vfs::{VfsConfig, DEFAULT_DIRECTORIES, DEFAULT_FILESYSTEM_KEY};

use crate::memory::{DEFAULT_MEMORY_KEY, DEFAULT_TOTAL_MEMORY};

/// Kernel version string written to `/etc/version`.
pub const KERNEL_VERSION: &str = "1.0.0";

/// Default contents of `/etc/motd`.
pub const DEFAULT_MOTD: &str = "Welcome to WebOS!";

/// Boot-time configuration. Every field has a default, so a partial JSON
/// document is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Version reported by `system_info` and written to `/etc/version`
    pub version: String,

    /// Memory pool capacity in bytes
    pub total_memory: u64,

    /// Storage key of the filesystem snapshot
    pub filesystem_key: String,

    /// Storage key of the memory subsystem marker
    pub memory_key: String,

    /// Directories seeded on boot
    pub default_directories: Vec<String>,

    /// Contents of `/etc/motd`
    pub motd: String,

    /// Fail `write_file` when the parent directory is missing
    pub require_parent: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            version: String::from(KERNEL_VERSION),
            total_memory: DEFAULT_TOTAL_MEMORY,
            filesystem_key: String::from(DEFAULT_FILESYSTEM_KEY),
            memory_key: String::from(DEFAULT_MEMORY_KEY),
            default_directories: DEFAULT_DIRECTORIES.iter().map(|d| String::from(*d)).collect(),
            motd: String::from(DEFAULT_MOTD),
            require_parent: true,
        }
    }
}

impl KernelConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }

    /// The VFS settings derived from this configuration.
    pub fn vfs_config(&self) -> VfsConfig {
        VfsConfig {
            storage_key: self.filesystem_key.clone(),
            require_parent: self.require_parent,
        }
    }
}
