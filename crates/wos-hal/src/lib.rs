//! Host Abstraction Layer for WebOS
//!
//! This crate defines the HAL trait that lets the kernel run on top of
//! different hosts by abstracting the two things it needs from the outside
//! world:
//!
//! - **Storage**: a string-keyed persistent store used for kernel snapshots
//! - **Time**: a wall clock used to stamp files, blocks and processes
//!
//! # Host Implementations
//!
//! - **MemoryHal**: in-process map with a settable clock (tests, ephemeral runs)
//! - **DirHal**: one file per key under a host directory, system clock

mod dir;
mod memory;

pub use dir::DirHal;
pub use memory::MemoryHal;

/// Host Abstraction Layer trait
///
/// Implementations provide platform-specific functionality for:
/// - Key-value storage (snapshot persistence)
/// - Wall-clock time
///
/// All methods take `&self`; implementations that mutate state use interior
/// mutability. The kernel is single-threaded, so no `Send`/`Sync` bound is
/// required.
pub trait HAL: 'static {
    // === Storage ===

    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// * `Ok(Some(value))` - Key exists
    /// * `Ok(None)` - Key not present
    /// * `Err(HalError)` - Backend failure
    fn storage_read(&self, key: &str) -> Result<Option<String>, HalError>;

    /// Store `value` under `key`, replacing any previous value.
    fn storage_write(&self, key: &str, value: &str) -> Result<(), HalError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn storage_delete(&self, key: &str) -> Result<(), HalError>;

    /// Check whether `key` is present.
    fn storage_exists(&self, key: &str) -> Result<bool, HalError> {
        Ok(self.storage_read(key)?.is_some())
    }

    // === Time ===

    /// Get wall-clock time in milliseconds since Unix epoch
    fn wallclock_ms(&self) -> u64;
}

/// HAL errors
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HalError {
    /// Storage key is not valid for this backend
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    /// Backend I/O failed
    #[error("storage I/O error: {0}")]
    Io(String),
    /// Stored value is not valid UTF-8
    #[error("stored value for '{0}' is not valid UTF-8")]
    InvalidUtf8(String),
    /// Operation not supported on this host
    #[error("operation not supported")]
    NotSupported,
}

impl From<std::io::Error> for HalError {
    fn from(e: std::io::Error) -> Self {
        HalError::Io(e.to_string())
    }
}
