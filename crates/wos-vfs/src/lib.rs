//! Virtual Filesystem for WebOS
//!
//! A flat, path-keyed namespace of files and directories kept in memory and
//! written through to the HAL's key-value storage after every mutation.
//!
//! # Layout
//!
//! - `core`: records, paths and errors
//! - `snapshot`: the persisted form and [`VfsConfig`]
//! - `vfs`: [`VirtualFileSystem`] itself
//! - `bootstrap`: default tree seeding

pub mod bootstrap;
pub mod core;
pub mod snapshot;
pub mod vfs;

pub use bootstrap::{seed_default_tree, DEFAULT_DIRECTORIES};
pub use core::{
    filename, is_direct_child, join_path, normalize_path, parent_path, resolve_path,
    validate_path, DirEntry, DirectoryRecord, FileRecord, FsStats, VfsError,
};
pub use snapshot::{Snapshot, VfsConfig, DEFAULT_FILESYSTEM_KEY, FIRST_INODE};
pub use vfs::VirtualFileSystem;
