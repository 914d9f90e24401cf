//! Filesystem bootstrap for the VFS layer.
//!
//! Seeds the default directory tree and system files on boot.

use wos_hal::HAL;

use crate::core::{normalize_path, parent_path, VfsError};
use crate::vfs::VirtualFileSystem;

/// Directories created on every boot.
pub const DEFAULT_DIRECTORIES: &[&str] = &["/home", "/etc", "/bin", "/var", "/tmp"];

/// Seed the default tree.
///
/// Directories that already exist are left alone, so this is safe to run
/// over a restored snapshot. Seed files are always (re)written, and their
/// parent directory is created first if `directories` did not include it.
///
/// Returns the number of directories created.
pub fn seed_default_tree<H: HAL, D: AsRef<str>>(
    vfs: &mut VirtualFileSystem<H>,
    directories: &[D],
    files: &[(&str, &str)],
) -> Result<usize, VfsError> {
    let mut created = 0;

    let mut ensure = |vfs: &mut VirtualFileSystem<H>, dir: &str| -> Result<(), VfsError> {
        if !vfs.exists(dir)? {
            vfs.create_directory(dir)?;
            created += 1;
        }
        Ok(())
    };

    for dir in directories {
        ensure(vfs, dir.as_ref())?;
    }

    for (path, content) in files {
        ensure(vfs, &parent_path(&normalize_path(path)?))?;
        vfs.write_file(path, content)?;
    }

    log::info!(
        "[vfs] bootstrap: {} directories created, {} files written",
        created,
        files.len()
    );
    Ok(created)
}
