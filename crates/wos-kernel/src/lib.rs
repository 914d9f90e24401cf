//! WebOS Kernel Core
//!
//! This crate implements the core kernel functionality:
//! - Memory accounting with per-process attribution
//! - Process supervision (PID assignment, lifecycle, cleanup)
//! - Filesystem facade over `wos-vfs` for applications
//! - Boot and shutdown sequencing
//!
//! The [`Kernel`] is a cheap-to-clone handle to shared state. It is `!Send`;
//! everything runs on one thread and applications cooperate through
//! suspension points in the async filesystem calls.

pub mod config;
pub mod error;
pub mod memory;
pub mod process;

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wos_hal::HAL;
use wos_vfs::{seed_default_tree, DirEntry, FileRecord, FsStats, VfsError, VirtualFileSystem};

pub use config::{KernelConfig, DEFAULT_MOTD, KERNEL_VERSION};
pub use error::{AppError, KernelError};
pub use memory::{BlockId, MemoryBlock, MemoryManager, MemoryStats};
pub use process::{App, AppFuture, Process, ProcessInfo, ProcessState};

use process::{AppFactory, ProcessControlBlock};

/// Process identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessId(pub u64);

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// System-wide summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Kernel version
    pub version: String,
    /// Processes not yet terminated
    pub processes: usize,
    /// Memory statistics (None before the memory manager is up)
    pub memory: Option<MemoryStats>,
    /// Filesystem statistics (None before the VFS is up)
    pub storage: Option<FsStats>,
}

struct KernelShared<H: HAL> {
    hal: Rc<H>,
    config: KernelConfig,
    memory: RefCell<Option<MemoryManager>>,
    vfs: RefCell<Option<VirtualFileSystem<H>>>,
    /// Process table (pid -> record)
    processes: RefCell<BTreeMap<ProcessId, Rc<RefCell<ProcessControlBlock<H>>>>>,
    next_pid: Cell<u64>,
    system_ready: Cell<bool>,
}

/// Handle to the kernel.
pub struct Kernel<H: HAL> {
    shared: Rc<KernelShared<H>>,
}

impl<H: HAL> Clone for Kernel<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<H: HAL> Kernel<H> {
    /// Create an uninitialized kernel over `hal`.
    pub fn new(hal: Rc<H>, config: KernelConfig) -> Self {
        Self {
            shared: Rc::new(KernelShared {
                hal,
                config,
                memory: RefCell::new(None),
                vfs: RefCell::new(None),
                processes: RefCell::new(BTreeMap::new()),
                next_pid: Cell::new(1),
                system_ready: Cell::new(false),
            }),
        }
    }

    pub fn hal(&self) -> &H {
        &self.shared.hal
    }

    pub fn config(&self) -> &KernelConfig {
        &self.shared.config
    }

    pub fn version(&self) -> &str {
        &self.shared.config.version
    }

    /// Current wall-clock time in milliseconds.
    pub fn now(&self) -> u64 {
        self.shared.hal.wallclock_ms()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.system_ready.get()
    }

    // ========== Lifecycle ==========

    /// Bring up memory, then the filesystem, then seed the default tree.
    ///
    /// `system_ready` is set only when every step succeeds. On failure the
    /// subsystems brought up so far stay visible in [`system_info`](Self::system_info)
    /// and calling `initialize` again resumes from the first step that has
    /// not completed. Calling it on a ready kernel does nothing.
    pub fn initialize(&self) -> Result<(), KernelError> {
        if self.is_ready() {
            return Ok(());
        }
        let shared = &self.shared;
        let config = &shared.config;
        log::info!("[kernel] booting WebOS {}", config.version);

        if shared.memory.borrow().is_none() {
            let memory = MemoryManager::new(config.total_memory);
            memory.initialize(&*shared.hal, &config.memory_key)?;
            *shared.memory.borrow_mut() = Some(memory);
        }

        let mut vfs = VirtualFileSystem::new(Rc::clone(&shared.hal), config.vfs_config());
        vfs.initialize()?;
        *shared.vfs.borrow_mut() = Some(vfs);
        self.seed_filesystem()?;

        shared.system_ready.set(true);
        log::info!("[kernel] system ready");
        Ok(())
    }

    fn seed_filesystem(&self) -> Result<(), KernelError> {
        let config = &self.shared.config;
        let files = [
            ("/etc/version", config.version.as_str()),
            ("/etc/motd", config.motd.as_str()),
        ];
        self.with_vfs(|vfs| seed_default_tree(vfs, &config.default_directories, &files))?;
        Ok(())
    }

    /// Terminate every tracked process and clear the process table.
    ///
    /// Filesystem and memory subsystems are left in place.
    pub fn shutdown(&self) {
        log::info!("[kernel] shutting down");
        let table = std::mem::take(&mut *self.shared.processes.borrow_mut());
        for pcb in table.values() {
            self.finish_process(pcb);
        }
        log::info!("[kernel] {} processes terminated", table.len());
    }

    /// System-wide summary.
    pub fn system_info(&self) -> SystemInfo {
        let processes = self
            .shared
            .processes
            .borrow()
            .values()
            .filter(|pcb| pcb.borrow().state != ProcessState::Terminated)
            .count();

        SystemInfo {
            version: self.shared.config.version.clone(),
            processes,
            memory: self.memory_stats(),
            storage: self.shared.vfs.borrow().as_ref().map(|vfs| vfs.stats()),
        }
    }

    // ========== Processes ==========

    /// Register a new process in state `Created`.
    ///
    /// The factory is invoked once, when the process is started.
    pub fn create_process<A, F>(&self, factory: F, options: Value) -> Result<Process<H>, KernelError>
    where
        A: App<H> + 'static,
        F: Fn() -> A + 'static,
    {
        if !self.is_ready() {
            return Err(KernelError::SystemNotReady);
        }

        let pid = ProcessId(self.shared.next_pid.get());
        self.shared.next_pid.set(pid.0 + 1);

        let factory: AppFactory<H> = Box::new(move || Box::new(factory()) as Box<dyn App<H>>);
        let pcb = Rc::new(RefCell::new(ProcessControlBlock::new(pid, factory, options)));
        self.shared
            .processes
            .borrow_mut()
            .insert(pid, Rc::clone(&pcb));
        log::info!("[kernel] registered process PID {}", pid);

        Ok(Process::new(pcb, self.clone()))
    }

    /// Look up a tracked process.
    pub fn process(&self, pid: ProcessId) -> Option<Process<H>> {
        let pcb = self.shared.processes.borrow().get(&pid).cloned()?;
        Some(Process::new(pcb, self.clone()))
    }

    /// Snapshot of every tracked process, ordered by PID.
    pub fn processes(&self) -> Vec<ProcessInfo> {
        self.shared
            .processes
            .borrow()
            .values()
            .map(|pcb| pcb.borrow().info())
            .collect()
    }

    /// Mark a process terminated and release its memory.
    pub(crate) fn finish_process(&self, pcb: &RefCell<ProcessControlBlock<H>>) {
        let now = self.now();
        let pid = {
            let mut pcb = pcb.borrow_mut();
            pcb.state = ProcessState::Terminated;
            pcb.end_time = Some(now);
            pcb.factory = None;
            pcb.pid
        };

        if let Some(memory) = self.shared.memory.borrow_mut().as_mut() {
            memory.cleanup_process_memory(pid);
        }
    }

    // ========== Memory ==========

    /// Allocate `size` bytes on behalf of `owner`. Fails with
    /// `SystemNotReady` until boot has completed.
    pub fn allocate(
        &self,
        owner: ProcessId,
        size: u64,
        description: &str,
    ) -> Result<BlockId, KernelError> {
        if !self.is_ready() {
            return Err(KernelError::SystemNotReady);
        }
        let now = self.now();
        let mut memory = self.shared.memory.borrow_mut();
        let memory = memory.as_mut().ok_or(KernelError::SystemNotReady)?;
        memory.allocate(size, owner, description, now)
    }

    pub fn deallocate(&self, id: BlockId) -> bool {
        self.shared
            .memory
            .borrow_mut()
            .as_mut()
            .map(|memory| memory.deallocate(id))
            .unwrap_or(false)
    }

    pub fn memory_stats(&self) -> Option<MemoryStats> {
        self.shared.memory.borrow().as_ref().map(|m| m.stats())
    }

    /// Live blocks attributed to `owner`.
    pub fn blocks_owned_by(&self, owner: ProcessId) -> Vec<MemoryBlock> {
        self.shared
            .memory
            .borrow()
            .as_ref()
            .map(|m| m.blocks_owned_by(owner).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    // ========== Filesystem ==========

    fn with_vfs<T>(
        &self,
        f: impl FnOnce(&mut VirtualFileSystem<H>) -> Result<T, VfsError>,
    ) -> Result<T, KernelError> {
        let mut vfs = self.shared.vfs.borrow_mut();
        let vfs = vfs.as_mut().ok_or(KernelError::SystemNotReady)?;
        Ok(f(vfs)?)
    }

    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, KernelError> {
        let entries = self.with_vfs(|vfs| vfs.list_directory(path))?;
        tokio::task::yield_now().await;
        Ok(entries)
    }

    pub async fn read_file(&self, path: &str) -> Result<String, KernelError> {
        let content = self.with_vfs(|vfs| vfs.read_file(path))?;
        tokio::task::yield_now().await;
        Ok(content)
    }

    pub async fn create_directory(&self, path: &str) -> Result<DirEntry, KernelError> {
        let dir = self.with_vfs(|vfs| vfs.create_directory(path))?;
        tokio::task::yield_now().await;
        Ok(DirEntry::from(&dir))
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<FileRecord, KernelError> {
        let file = self.with_vfs(|vfs| vfs.write_file(path, content))?;
        tokio::task::yield_now().await;
        Ok(file)
    }

    pub async fn delete_file(&self, path: &str) -> Result<(), KernelError> {
        self.with_vfs(|vfs| vfs.delete_file(path))?;
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Look up a file or directory without touching storage.
    pub fn stat(&self, path: &str) -> Result<DirEntry, KernelError> {
        self.with_vfs(|vfs| vfs.stat(path))
    }

    pub fn fs_stats(&self) -> Option<FsStats> {
        self.shared.vfs.borrow().as_ref().map(|vfs| vfs.stats())
    }
}
