//! Kernel error types.

use wos_hal::HalError;
use wos_vfs::VfsError;

use crate::ProcessId;

/// Errors returned by kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Named object does not exist
    #[error("{0}: not found")]
    NotFound(String),

    /// Named object already exists
    #[error("{0}: already exists")]
    AlreadyExists(String),

    /// Allocation would exceed total capacity
    #[error("out of memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: u64, available: u64 },

    /// Process was already started (or terminated)
    #[error("process {0} already started")]
    AlreadyStarted(ProcessId),

    /// Kernel has not finished initializing
    #[error("system not ready")]
    SystemNotReady,

    /// Filesystem error
    #[error(transparent)]
    Vfs(#[from] VfsError),

    /// Storage backend error
    #[error(transparent)]
    Hal(#[from] HalError),

    /// Application entry point failed
    #[error("process {pid} failed: {source}")]
    AppFailed {
        pid: ProcessId,
        #[source]
        source: AppError,
    },
}

impl KernelError {
    /// Check if this is a "not found" error at any layer.
    pub fn is_not_found(&self) -> bool {
        match self {
            KernelError::NotFound(_) => true,
            KernelError::Vfs(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// Errors raised by application entry points.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Application-defined failure
    #[error("{0}")]
    Failed(String),

    /// A kernel call made by the application failed
    #[error(transparent)]
    Kernel(Box<KernelError>),
}

impl AppError {
    /// Create an application failure with a message.
    pub fn failed(msg: impl Into<String>) -> Self {
        AppError::Failed(msg.into())
    }
}

impl From<KernelError> for AppError {
    fn from(e: KernelError) -> Self {
        AppError::Kernel(Box::new(e))
    }
}

impl From<VfsError> for AppError {
    fn from(e: VfsError) -> Self {
        AppError::Kernel(Box::new(KernelError::Vfs(e)))
    }
}
