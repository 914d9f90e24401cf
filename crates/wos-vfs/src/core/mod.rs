//! Core VFS types and utilities

mod error;
mod path;
mod types;

pub use error::VfsError;
pub use path::{filename, is_direct_child, join_path, normalize_path, parent_path, resolve_path, validate_path};
pub use types::{DirEntry, DirectoryRecord, FileRecord, FsStats};
