//! Error types for the VFS layer.

use wos_hal::HalError;

/// Errors from VFS operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VfsError {
    /// Path not found
    #[error("{0}: not found")]
    NotFound(String),

    /// Path already exists
    #[error("{0}: already exists")]
    AlreadyExists(String),

    /// Path names a directory where a file was expected
    #[error("{0}: is a directory")]
    IsADirectory(String),

    /// Invalid path format
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Storage backend error
    #[error("storage error: {0}")]
    Storage(#[from] HalError),

    /// Snapshot could not be encoded or decoded
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl VfsError {
    /// Create a not found error for a path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an invalid path error with message.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::InvalidPath(msg.into())
    }

    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VfsError::NotFound(_))
    }

    /// Check if this is an "already exists" error.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, VfsError::AlreadyExists(_))
    }
}

impl From<serde_json::Error> for VfsError {
    fn from(e: serde_json::Error) -> Self {
        VfsError::Snapshot(e.to_string())
    }
}
