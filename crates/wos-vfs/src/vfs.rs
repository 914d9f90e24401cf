//! The virtual filesystem.
//!
//! The namespace is flat: two ordered maps keyed by absolute path, one for
//! files and one for directories. Directory listings are rebuilt from the
//! directory's child set plus a prefix scan over the directory map.
//!
//! Every successful operation writes a full snapshot through the HAL. A
//! change is kept in memory only if that write succeeds; otherwise the
//! touched entries and the inode counter are restored.

use std::collections::BTreeMap;
use std::rc::Rc;

use wos_hal::HAL;

use crate::core::{
    is_direct_child, normalize_path, parent_path, DirEntry, DirectoryRecord, FileRecord, FsStats,
    VfsError,
};
use crate::snapshot::{Snapshot, VfsConfig, FIRST_INODE};

/// Prior values of the entries an operation is about to change.
struct Undo {
    next_inode: u64,
    files: Vec<(String, Option<FileRecord>)>,
    directories: Vec<(String, Option<DirectoryRecord>)>,
}

/// Path-keyed virtual filesystem with write-through persistence.
pub struct VirtualFileSystem<H: HAL> {
    hal: Rc<H>,
    config: VfsConfig,
    /// File table (path -> record)
    files: BTreeMap<String, FileRecord>,
    /// Directory table (path -> record)
    directories: BTreeMap<String, DirectoryRecord>,
    /// Next inode to hand out
    next_inode: u64,
}

impl<H: HAL> VirtualFileSystem<H> {
    /// Create an empty, uninitialized filesystem. Call [`initialize`](Self::initialize)
    /// before use.
    pub fn new(hal: Rc<H>, config: VfsConfig) -> Self {
        Self {
            hal,
            config,
            files: BTreeMap::new(),
            directories: BTreeMap::new(),
            next_inode: FIRST_INODE,
        }
    }

    /// Load the persisted snapshot, or create `/` on a fresh store.
    pub fn initialize(&mut self) -> Result<(), VfsError> {
        match self.hal.storage_read(&self.config.storage_key)? {
            Some(data) => {
                let snapshot = Snapshot::from_json(&data)?;
                self.next_inode = snapshot.safe_next_inode();
                self.files = snapshot.files.into_iter().collect();
                self.directories = snapshot.directories.into_iter().collect();
                log::info!(
                    "[vfs] restored snapshot: {} files, {} directories",
                    self.files.len(),
                    self.directories.len()
                );

                if !self.directories.contains_key("/") {
                    log::warn!("[vfs] snapshot had no root directory, recreating");
                    self.create_directory("/")?;
                }
            }
            None => {
                self.files.clear();
                self.directories.clear();
                self.next_inode = FIRST_INODE;
                self.create_directory("/")?;
                log::info!("[vfs] created empty filesystem");
            }
        }
        Ok(())
    }

    /// Write the full namespace to storage.
    pub fn save_state(&self) -> Result<(), VfsError> {
        let snapshot = self.snapshot();
        self.hal
            .storage_write(&self.config.storage_key, &snapshot.to_json()?)?;
        Ok(())
    }

    /// Build the serializable form of the namespace.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            files: self
                .files
                .iter()
                .map(|(p, f)| (p.clone(), f.clone()))
                .collect(),
            directories: self
                .directories
                .iter()
                .map(|(p, d)| (p.clone(), d.clone()))
                .collect(),
            next_inode: self.next_inode,
        }
    }

    fn capture(&self, files: &[&str], directories: &[&str]) -> Undo {
        Undo {
            next_inode: self.next_inode,
            files: files
                .iter()
                .map(|p| (String::from(*p), self.files.get(*p).cloned()))
                .collect(),
            directories: directories
                .iter()
                .map(|p| (String::from(*p), self.directories.get(*p).cloned()))
                .collect(),
        }
    }

    /// Persist the current state, or restore `undo` if the write fails.
    fn commit(&mut self, undo: Undo) -> Result<(), VfsError> {
        let result = self.save_state();
        if let Err(e) = &result {
            log::warn!("[vfs] save failed, rolling back: {}", e);
            self.next_inode = undo.next_inode;
            for (path, record) in undo.files {
                match record {
                    Some(file) => self.files.insert(path, file),
                    None => self.files.remove(&path),
                };
            }
            for (path, record) in undo.directories {
                match record {
                    Some(dir) => self.directories.insert(path, dir),
                    None => self.directories.remove(&path),
                };
            }
        }
        result
    }

    fn generate_inode(&mut self) -> u64 {
        let inode = self.next_inode;
        self.next_inode += 1;
        inode
    }

    // ========== Directory Operations ==========

    /// Create a directory.
    pub fn create_directory(&mut self, path: &str) -> Result<DirectoryRecord, VfsError> {
        let path = normalize_path(path)?;

        if self.directories.contains_key(&path) || self.files.contains_key(&path) {
            return Err(VfsError::AlreadyExists(path));
        }

        let undo = self.capture(&[], &[path.as_str()]);
        let inode = self.generate_inode();
        let directory = DirectoryRecord::new(inode, path.clone(), self.hal.wallclock_ms());
        self.directories.insert(path.clone(), directory.clone());
        log::debug!("[vfs] mkdir {} (inode {})", path, inode);

        self.commit(undo)?;
        Ok(directory)
    }

    /// List directory contents.
    ///
    /// Returns the registered files that still exist, followed by the
    /// directories exactly one segment below `path`.
    pub fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
        let path = normalize_path(path)?;
        let directory = self
            .directories
            .get(&path)
            .ok_or_else(|| VfsError::not_found(path.as_str()))?;

        let mut entries: Vec<DirEntry> = directory
            .items
            .iter()
            .filter_map(|item| self.files.get(item))
            .map(DirEntry::from)
            .collect();

        entries.extend(
            self.directories
                .iter()
                .filter(|(p, _)| is_direct_child(p, &path))
                .map(|(_, d)| DirEntry::from(d)),
        );

        Ok(entries)
    }

    // ========== File Operations ==========

    /// Write a file (create or overwrite).
    pub fn write_file(&mut self, path: &str, content: &str) -> Result<FileRecord, VfsError> {
        let path = normalize_path(path)?;

        if self.directories.contains_key(&path) {
            return Err(VfsError::IsADirectory(path));
        }

        let parent = parent_path(&path);
        let parent_exists = self.directories.contains_key(&parent);
        if !parent_exists && self.config.require_parent {
            return Err(VfsError::NotFound(parent));
        }

        let undo = self.capture(&[path.as_str()], &[parent.as_str()]);
        let now = self.hal.wallclock_ms();
        let file = match self.files.get_mut(&path) {
            Some(existing) => {
                existing.overwrite(String::from(content), now);
                existing.clone()
            }
            None => {
                let inode = self.generate_inode();
                let file = FileRecord::new(inode, path.clone(), String::from(content), now);
                self.files.insert(path.clone(), file.clone());
                file
            }
        };

        match self.directories.get_mut(&parent) {
            Some(dir) => {
                dir.items.insert(path.clone());
                dir.modified = now;
            }
            None => log::warn!("[vfs] {} written without parent directory {}", path, parent),
        }
        log::debug!("[vfs] write {} ({} bytes, inode {})", path, file.size, file.inode);

        self.commit(undo)?;
        Ok(file)
    }

    /// Read a file, refreshing its access time.
    pub fn read_file(&mut self, path: &str) -> Result<String, VfsError> {
        let path = normalize_path(path)?;
        let now = self.hal.wallclock_ms();
        let undo = self.capture(&[path.as_str()], &[]);

        let content = {
            let file = self
                .files
                .get_mut(&path)
                .ok_or_else(|| VfsError::not_found(path.as_str()))?;
            file.accessed = now;
            file.content.clone()
        };

        self.commit(undo)?;
        Ok(content)
    }

    /// Delete a file.
    pub fn delete_file(&mut self, path: &str) -> Result<(), VfsError> {
        let path = normalize_path(path)?;

        if !self.files.contains_key(&path) {
            return Err(VfsError::NotFound(path));
        }

        let parent = parent_path(&path);
        let undo = self.capture(&[path.as_str()], &[parent.as_str()]);
        self.files.remove(&path);
        if let Some(dir) = self.directories.get_mut(&parent) {
            dir.items.remove(&path);
            dir.modified = self.hal.wallclock_ms();
        }
        log::debug!("[vfs] unlink {}", path);

        self.commit(undo)?;
        Ok(())
    }

    // ========== Metadata Operations ==========

    /// Check if a file or directory exists at `path`.
    pub fn exists(&self, path: &str) -> Result<bool, VfsError> {
        let path = normalize_path(path)?;
        Ok(self.files.contains_key(&path) || self.directories.contains_key(&path))
    }

    /// Get the entry for a file or directory.
    pub fn stat(&self, path: &str) -> Result<DirEntry, VfsError> {
        let path = normalize_path(path)?;
        if let Some(dir) = self.directories.get(&path) {
            return Ok(DirEntry::from(dir));
        }
        self.files
            .get(&path)
            .map(DirEntry::from)
            .ok_or(VfsError::NotFound(path))
    }

    /// Look up a file record.
    pub fn file(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    /// Look up a directory record.
    pub fn directory(&self, path: &str) -> Option<&DirectoryRecord> {
        self.directories.get(path)
    }

    /// The inode the next created entry will receive.
    pub fn next_inode(&self) -> u64 {
        self.next_inode
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> FsStats {
        FsStats {
            total_files: self.files.len() as u64,
            total_directories: self.directories.len() as u64,
            total_size: self.files.values().map(|f| f.size).sum(),
        }
    }
}
