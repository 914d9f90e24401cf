//! Process supervision.
//!
//! A process wraps one application instance. Its record lives in the
//! kernel's process table and is shared with every [`Process`] handle, so
//! state changes made through any handle are visible everywhere.
//!
//! ```text
//! Created --start--> Running --(ok | err)--> Terminated
//! Created | Running --terminate--> Terminated
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use wos_hal::HAL;

use crate::error::{AppError, KernelError};
use crate::memory::BlockId;
use crate::{Kernel, ProcessId};

/// Future returned by an application entry point.
pub type AppFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, AppError>> + 'a>>;

/// Boxed application factory stored in the process record until start.
pub(crate) type AppFactory<H> = Box<dyn Fn() -> Box<dyn App<H>>>;

/// An application that can run as a managed process.
pub trait App<H: HAL> {
    /// Human-readable application name.
    fn name(&self) -> &str;

    /// Entry point. Receives its own process handle and the options passed
    /// to `create_process`.
    fn main<'a>(&'a mut self, process: Process<H>, options: Value) -> AppFuture<'a>;
}

/// Process state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    /// Registered, not yet started
    Created,
    /// Entry point in progress
    Running,
    /// Finished, failed or killed
    Terminated,
}

impl ProcessState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessState::Created => "created",
            ProcessState::Running => "running",
            ProcessState::Terminated => "terminated",
        }
    }
}

/// Point-in-time view of a process, as shown by `ps`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub app_name: Option<String>,
    pub state: ProcessState,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
}

/// Process record held by the process table.
pub(crate) struct ProcessControlBlock<H: HAL> {
    pub pid: ProcessId,
    pub state: ProcessState,
    pub options: Value,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    /// Filled in when the application is instantiated
    pub app_name: Option<String>,
    /// Taken on start; a process runs its application at most once
    pub factory: Option<AppFactory<H>>,
}

impl<H: HAL> ProcessControlBlock<H> {
    pub fn new(pid: ProcessId, factory: AppFactory<H>, options: Value) -> Self {
        Self {
            pid,
            state: ProcessState::Created,
            options,
            start_time: None,
            end_time: None,
            app_name: None,
            factory: Some(factory),
        }
    }

    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            app_name: self.app_name.clone(),
            state: self.state,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Handle to a managed process.
pub struct Process<H: HAL> {
    pid: ProcessId,
    pcb: Rc<RefCell<ProcessControlBlock<H>>>,
    kernel: Kernel<H>,
}

impl<H: HAL> Clone for Process<H> {
    fn clone(&self) -> Self {
        Self {
            pid: self.pid,
            pcb: Rc::clone(&self.pcb),
            kernel: self.kernel.clone(),
        }
    }
}

impl<H: HAL> Process<H> {
    pub(crate) fn new(pcb: Rc<RefCell<ProcessControlBlock<H>>>, kernel: Kernel<H>) -> Self {
        let pid = pcb.borrow().pid;
        Self { pid, pcb, kernel }
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn state(&self) -> ProcessState {
        self.pcb.borrow().state
    }

    pub fn start_time(&self) -> Option<u64> {
        self.pcb.borrow().start_time
    }

    pub fn end_time(&self) -> Option<u64> {
        self.pcb.borrow().end_time
    }

    pub fn options(&self) -> Value {
        self.pcb.borrow().options.clone()
    }

    pub fn app_name(&self) -> Option<String> {
        self.pcb.borrow().app_name.clone()
    }

    pub fn info(&self) -> ProcessInfo {
        self.pcb.borrow().info()
    }

    /// The kernel this process belongs to.
    pub fn kernel(&self) -> &Kernel<H> {
        &self.kernel
    }

    /// Run the application to completion.
    ///
    /// The process ends `Terminated` whether the entry point succeeds or
    /// fails; a failure is returned as [`KernelError::AppFailed`].
    pub async fn start(&self) -> Result<Value, KernelError> {
        let (factory, options) = {
            let mut pcb = self.pcb.borrow_mut();
            if pcb.state != ProcessState::Created {
                return Err(KernelError::AlreadyStarted(self.pid));
            }
            let factory = pcb
                .factory
                .take()
                .ok_or(KernelError::AlreadyStarted(self.pid))?;
            pcb.state = ProcessState::Running;
            pcb.start_time = Some(self.kernel.now());
            (factory, pcb.options.clone())
        };

        let mut app = factory();
        let name = String::from(app.name());
        self.pcb.borrow_mut().app_name = Some(name.clone());
        log::info!("[process] starting PID {} ({})", self.pid, name);

        let result = app.main(self.clone(), options).await;
        self.kernel.finish_process(&self.pcb);

        match result {
            Ok(value) => {
                log::info!("[process] PID {} exited", self.pid);
                Ok(value)
            }
            Err(e) => {
                log::error!("[process] PID {} failed: {}", self.pid, e);
                Err(KernelError::AppFailed {
                    pid: self.pid,
                    source: e,
                })
            }
        }
    }

    /// Force the process into `Terminated` and release its memory.
    ///
    /// Bookkeeping only: a running entry point is not interrupted.
    pub fn terminate(&self) {
        self.kernel.finish_process(&self.pcb);
        log::info!("[process] PID {} terminated", self.pid);
    }

    /// Allocate memory attributed to this process.
    pub fn allocate(&self, size: u64, description: &str) -> Result<BlockId, KernelError> {
        self.kernel.allocate(self.pid, size, description)
    }

    pub fn deallocate(&self, id: BlockId) -> bool {
        self.kernel.deallocate(id)
    }
}
