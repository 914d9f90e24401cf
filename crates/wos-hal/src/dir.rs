//! Directory-backed HAL implementation.
//!
//! Each storage key maps to one file `<root>/<key>.json`. Writes go to a
//! sibling temp file first and are renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{HalError, HAL};

/// Extension appended to every key on disk.
const VALUE_EXT: &str = "json";

/// HAL that persists storage under a host directory.
pub struct DirHal {
    root: PathBuf,
}

impl DirHal {
    /// Open (creating if needed) a storage directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, HalError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("[hal] storage directory {}", root.display());
        Ok(Self { root })
    }

    /// The directory this HAL stores keys under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, HalError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{}.{}", key, VALUE_EXT)))
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<(), HalError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(HalError::InvalidKey(String::from(key)))
    }
}

impl HAL for DirHal {
    fn storage_read(&self, key: &str) -> Result<Option<String>, HalError> {
        let path = self.key_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| HalError::InvalidUtf8(String::from(key))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn storage_write(&self, key: &str, value: &str) -> Result<(), HalError> {
        let path = self.key_path(key)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn storage_delete(&self, key: &str) -> Result<(), HalError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn wallclock_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
