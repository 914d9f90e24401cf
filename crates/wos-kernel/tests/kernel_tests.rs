//! Kernel integration tests
//!
//! Boot, process lifecycle, memory attribution and persistence, driven
//! through the public kernel API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Value};
use wos_hal::{DirHal, HalError, MemoryHal, HAL};
use wos_kernel::{
    App, AppError, AppFuture, Kernel, KernelConfig, KernelError, Process, ProcessId, ProcessState,
};

// ============================================================================
// Test HAL and applications
// ============================================================================

/// MemoryHal whose writes can be made to fail.
struct FlakyHal {
    inner: MemoryHal,
    fail_writes: Cell<bool>,
}

impl FlakyHal {
    fn new() -> Self {
        Self {
            inner: MemoryHal::new(),
            fail_writes: Cell::new(false),
        }
    }
}

impl HAL for FlakyHal {
    fn storage_read(&self, key: &str) -> Result<Option<String>, HalError> {
        self.inner.storage_read(key)
    }

    fn storage_write(&self, key: &str, value: &str) -> Result<(), HalError> {
        if self.fail_writes.get() {
            return Err(HalError::Io(String::from("disk full")));
        }
        self.inner.storage_write(key, value)
    }

    fn storage_delete(&self, key: &str) -> Result<(), HalError> {
        self.inner.storage_delete(key)
    }

    fn wallclock_ms(&self) -> u64 {
        self.inner.wallclock_ms()
    }
}

/// Returns its options unchanged.
struct EchoApp;

impl<H: HAL> App<H> for EchoApp {
    fn name(&self) -> &str {
        "echo"
    }

    fn main<'a>(&'a mut self, _process: Process<H>, options: Value) -> AppFuture<'a> {
        Box::pin(async move { Ok(options) })
    }
}

/// Allocates memory, then fails.
struct FailingApp;

impl<H: HAL> App<H> for FailingApp {
    fn name(&self) -> &str {
        "failing"
    }

    fn main<'a>(&'a mut self, process: Process<H>, _options: Value) -> AppFuture<'a> {
        Box::pin(async move {
            process.allocate(1024, "scratch")?;
            Err(AppError::failed("boom"))
        })
    }
}

/// Writes a file through the kernel and reports its own state.
struct WriterApp;

impl<H: HAL> App<H> for WriterApp {
    fn name(&self) -> &str {
        "writer"
    }

    fn main<'a>(&'a mut self, process: Process<H>, options: Value) -> AppFuture<'a> {
        Box::pin(async move {
            let path = options["path"].as_str().unwrap_or("/tmp/out.txt").to_string();
            let kernel = process.kernel();
            kernel.write_file(&path, "written by app").await?;
            let content = kernel.read_file(&path).await?;
            process.allocate(4096, "buffer")?;
            Ok(json!({
                "content": content,
                "state": process.state().as_str(),
                "pid": process.pid().0,
            }))
        })
    }
}

/// Writes, reads and allocates in rounds, recording each finished round.
struct RoundsApp {
    journal: Rc<RefCell<Vec<String>>>,
}

impl<H: HAL> App<H> for RoundsApp {
    fn name(&self) -> &str {
        "rounds"
    }

    fn main<'a>(&'a mut self, process: Process<H>, options: Value) -> AppFuture<'a> {
        Box::pin(async move {
            let tag = options["tag"].as_str().unwrap_or("app").to_string();
            let kernel = process.kernel();
            for round in 0..3 {
                let path = format!("/tmp/{}-{}", tag, round);
                process.allocate(1024, "round buffer")?;
                kernel.write_file(&path, &tag).await?;
                let content = kernel.read_file(&path).await?;
                if content != tag {
                    return Err(AppError::failed(format!("{} read back {}", path, content)));
                }
                self.journal.borrow_mut().push(format!("{}{}", tag, round));
                tokio::task::yield_now().await;
            }
            Ok(json!({ "blocks": kernel.blocks_owned_by(process.pid()).len() }))
        })
    }
}

fn boot() -> (Rc<MemoryHal>, Kernel<MemoryHal>) {
    let hal = Rc::new(MemoryHal::new());
    let kernel = Kernel::new(hal.clone(), KernelConfig::default());
    kernel.initialize().unwrap();
    (hal, kernel)
}

// ============================================================================
// Boot
// ============================================================================

#[tokio::test]
async fn test_initialize_seeds_default_tree() {
    let (hal, kernel) = boot();
    assert!(kernel.is_ready());

    let names: Vec<String> = kernel
        .list_directory("/")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["bin", "etc", "home", "tmp", "var"]);

    assert_eq!(kernel.read_file("/etc/version").await.unwrap(), "1.0.0");
    assert_eq!(kernel.read_file("/etc/motd").await.unwrap(), "Welcome to WebOS!");
    assert_eq!(hal.storage_read("webos_memory").unwrap().as_deref(), Some("{}"));
}

#[test]
fn test_system_info() {
    let hal = Rc::new(MemoryHal::new());
    let kernel = Kernel::new(hal, KernelConfig::default());

    let info = kernel.system_info();
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.processes, 0);
    assert!(info.memory.is_none());
    assert!(info.storage.is_none());

    kernel.initialize().unwrap();
    let info = kernel.system_info();
    let memory = info.memory.unwrap();
    assert_eq!(memory.total, 10_485_760);
    assert_eq!(memory.used + memory.free, memory.total);
    let storage = info.storage.unwrap();
    assert_eq!(storage.total_directories, 6);
    assert_eq!(storage.total_files, 2);
}

#[test]
fn test_initialize_twice_is_noop() {
    let (hal, kernel) = boot();
    let writes = hal.write_count();
    kernel.initialize().unwrap();
    assert_eq!(hal.write_count(), writes);
}

#[test]
fn test_failed_initialize_is_retryable() {
    let hal = Rc::new(FlakyHal::new());
    let kernel = Kernel::new(hal.clone(), KernelConfig::default());

    hal.fail_writes.set(true);
    let err = kernel.initialize().unwrap_err();
    assert!(matches!(err, KernelError::Hal(HalError::Io(_))));
    assert!(!kernel.is_ready());
    assert!(matches!(
        kernel.create_process(|| EchoApp, json!({})),
        Err(KernelError::SystemNotReady)
    ));

    hal.fail_writes.set(false);
    kernel.initialize().unwrap();
    assert!(kernel.is_ready());
    assert_eq!(kernel.system_info().storage.unwrap().total_directories, 6);
}

#[test]
fn test_partial_initialize_visible_in_system_info() {
    let hal = Rc::new(FlakyHal::new());
    // Memory marker already present, so the memory step needs no write
    hal.inner.storage_write("webos_memory", "{}").unwrap();
    hal.fail_writes.set(true);

    let kernel = Kernel::new(hal, KernelConfig::default());
    assert!(kernel.initialize().is_err());

    let info = kernel.system_info();
    assert!(info.memory.is_some());
    assert!(info.storage.is_none());
}

#[test]
fn test_seed_files_get_parent_without_etc_in_config() {
    let hal = Rc::new(MemoryHal::new());
    let config = KernelConfig::from_json(r#"{"default_directories": ["/home", "/tmp"]}"#).unwrap();
    let kernel = Kernel::new(hal, config);

    kernel.initialize().unwrap();
    assert!(kernel.is_ready());
    assert!(kernel.stat("/etc").unwrap().is_directory);
    assert!(kernel.stat("/etc/motd").is_ok());
    assert!(kernel.stat("/bin").is_err());
}

#[test]
fn test_allocate_refused_until_ready() {
    let hal = Rc::new(FlakyHal::new());
    hal.inner.storage_write("webos_memory", "{}").unwrap();
    hal.fail_writes.set(true);

    let kernel = Kernel::new(hal.clone(), KernelConfig::default());
    assert!(kernel.initialize().is_err());
    assert!(kernel.memory_stats().is_some());
    assert!(matches!(
        kernel.allocate(ProcessId(1), 10, "early"),
        Err(KernelError::SystemNotReady)
    ));

    hal.fail_writes.set(false);
    kernel.initialize().unwrap();
    kernel.allocate(ProcessId(1), 10, "late").unwrap();
    assert_eq!(kernel.memory_stats().unwrap().used, 10);
}

#[tokio::test]
async fn test_second_kernel_reloads_snapshot() {
    let dir = tempfile::tempdir().unwrap();

    {
        let hal = Rc::new(DirHal::open(dir.path()).unwrap());
        let kernel = Kernel::new(hal, KernelConfig::default());
        kernel.initialize().unwrap();
        kernel.write_file("/home/notes.txt", "remember").await.unwrap();
        kernel.create_directory("/home/projects").await.unwrap();
    }

    let hal = Rc::new(DirHal::open(dir.path()).unwrap());
    let kernel = Kernel::new(hal, KernelConfig::default());
    kernel.initialize().unwrap();

    assert_eq!(kernel.read_file("/home/notes.txt").await.unwrap(), "remember");
    let names: Vec<String> = kernel
        .list_directory("/home")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["notes.txt", "projects"]);

    // Inode counter continues past restored records
    let notes = kernel.stat("/home/notes.txt").unwrap();
    let fresh = kernel.write_file("/tmp/fresh", "").await.unwrap();
    assert!(fresh.inode > notes.inode);
}

#[test]
fn test_custom_config() {
    let hal = Rc::new(MemoryHal::new());
    let config = KernelConfig {
        version: String::from("2.0.0"),
        total_memory: 100,
        default_directories: vec![String::from("/etc"), String::from("/srv")],
        ..KernelConfig::default()
    };
    let kernel = Kernel::new(hal, config);
    kernel.initialize().unwrap();

    assert!(kernel.stat("/srv").unwrap().is_directory);
    assert!(kernel.stat("/home").is_err());
    assert_eq!(kernel.system_info().memory.unwrap().total, 100);
    assert!(matches!(
        kernel.allocate(ProcessId(1), 101, "too big"),
        Err(KernelError::OutOfMemory { .. })
    ));
}

// ============================================================================
// Processes
// ============================================================================

#[test]
fn test_create_process_before_initialize() {
    let hal = Rc::new(MemoryHal::new());
    let kernel = Kernel::new(hal, KernelConfig::default());
    assert!(matches!(
        kernel.create_process(|| EchoApp, json!({})),
        Err(KernelError::SystemNotReady)
    ));
}

#[test]
fn test_pids_strictly_increase() {
    let (_hal, kernel) = boot();

    let mut last = 0;
    for _ in 0..5 {
        let process = kernel.create_process(|| EchoApp, json!({})).unwrap();
        assert_eq!(process.state(), ProcessState::Created);
        assert!(process.pid().0 > last);
        last = process.pid().0;
    }
    assert_eq!(last, 5);

    // Shutdown clears the table but never recycles PIDs
    kernel.shutdown();
    let process = kernel.create_process(|| EchoApp, json!({})).unwrap();
    assert_eq!(process.pid(), ProcessId(6));
}

#[tokio::test]
async fn test_start_runs_to_completion() {
    let (hal, kernel) = boot();
    hal.set_tick(1);

    let process = kernel
        .create_process(|| EchoApp, json!({"greeting": "hi"}))
        .unwrap();
    assert_eq!(process.app_name(), None);

    let result = process.start().await.unwrap();
    assert_eq!(result, json!({"greeting": "hi"}));
    assert_eq!(process.state(), ProcessState::Terminated);
    assert_eq!(process.app_name().as_deref(), Some("echo"));

    let start = process.start_time().unwrap();
    let end = process.end_time().unwrap();
    assert!(end >= start);
}

#[tokio::test]
async fn test_start_twice_fails() {
    let (_hal, kernel) = boot();
    let process = kernel.create_process(|| EchoApp, json!({})).unwrap();

    process.start().await.unwrap();
    assert!(matches!(
        process.start().await,
        Err(KernelError::AlreadyStarted(pid)) if pid == process.pid()
    ));
}

#[tokio::test]
async fn test_failing_app_terminates_and_reports() {
    let (_hal, kernel) = boot();
    let process = kernel.create_process(|| FailingApp, json!({})).unwrap();

    let err = process.start().await.unwrap_err();
    match err {
        KernelError::AppFailed { pid, source } => {
            assert_eq!(pid, process.pid());
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(process.state(), ProcessState::Terminated);
    assert!(process.end_time().is_some());
    assert!(kernel.blocks_owned_by(process.pid()).is_empty());
}

#[tokio::test]
async fn test_app_uses_kernel_facade() {
    let (_hal, kernel) = boot();
    let process = kernel
        .create_process(|| WriterApp, json!({"path": "/home/app.txt"}))
        .unwrap();

    let result = process.start().await.unwrap();
    assert_eq!(result["content"], "written by app");
    assert_eq!(result["state"], "running");
    assert_eq!(result["pid"], 1);

    assert_eq!(kernel.read_file("/home/app.txt").await.unwrap(), "written by app");
    // Memory is released when the process ends
    assert_eq!(kernel.memory_stats().unwrap().used, 0);
}

#[tokio::test]
async fn test_app_error_from_kernel_call() {
    let (_hal, kernel) = boot();
    let process = kernel
        .create_process(|| WriterApp, json!({"path": "/missing/dir/file"}))
        .unwrap();

    let err = process.start().await.unwrap_err();
    match err {
        KernelError::AppFailed {
            source: AppError::Kernel(inner),
            ..
        } => assert!(inner.is_not_found()),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_terminate_releases_memory() {
    let (_hal, kernel) = boot();
    let process = kernel.create_process(|| EchoApp, json!({})).unwrap();
    let other = kernel.create_process(|| EchoApp, json!({})).unwrap();

    process.allocate(100, "a").unwrap();
    process.allocate(200, "b").unwrap();
    other.allocate(50, "c").unwrap();
    assert_eq!(kernel.memory_stats().unwrap().used, 350);

    process.terminate();
    assert_eq!(process.state(), ProcessState::Terminated);
    assert!(process.end_time().is_some());
    assert!(kernel.blocks_owned_by(process.pid()).is_empty());
    assert_eq!(kernel.blocks_owned_by(other.pid()).len(), 1);
    assert_eq!(kernel.memory_stats().unwrap().used, 50);

    // Terminating again refreshes end time and is otherwise harmless
    process.terminate();
    assert_eq!(process.state(), ProcessState::Terminated);
}

#[tokio::test]
async fn test_terminated_process_cannot_start() {
    let (_hal, kernel) = boot();
    let process = kernel.create_process(|| EchoApp, json!({})).unwrap();
    process.terminate();
    assert!(matches!(
        process.start().await,
        Err(KernelError::AlreadyStarted(_))
    ));
}

#[test]
fn test_memory_capacity_scenario() {
    let (_hal, kernel) = boot();
    let process = kernel.create_process(|| EchoApp, json!({})).unwrap();

    process.allocate(5_242_880, "first").unwrap();
    assert!(matches!(
        process.allocate(5_242_881, "second"),
        Err(KernelError::OutOfMemory { .. })
    ));

    process.terminate();
    kernel.allocate(process.pid(), 5_242_881, "after cleanup").unwrap();
}

#[test]
fn test_deallocate_unknown_block() {
    let (_hal, kernel) = boot();
    let process = kernel.create_process(|| EchoApp, json!({})).unwrap();
    let block = process.allocate(10, "x").unwrap();

    assert!(process.deallocate(block));
    assert!(!process.deallocate(block));
}

#[test]
fn test_process_lookup_and_listing() {
    let (_hal, kernel) = boot();
    let a = kernel.create_process(|| EchoApp, json!({"n": 1})).unwrap();
    let b = kernel.create_process(|| EchoApp, json!({"n": 2})).unwrap();
    b.terminate();

    let found = kernel.process(a.pid()).unwrap();
    assert_eq!(found.options(), json!({"n": 1}));
    assert!(kernel.process(ProcessId(99)).is_none());

    let listing = kernel.processes();
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[0].state, ProcessState::Created);
    assert_eq!(listing[1].state, ProcessState::Terminated);

    // Only processes that have not terminated count as live
    assert_eq!(kernel.system_info().processes, 1);
}

#[test]
fn test_shutdown_terminates_everything() {
    let (_hal, kernel) = boot();
    let a = kernel.create_process(|| EchoApp, json!({})).unwrap();
    let b = kernel.create_process(|| EchoApp, json!({})).unwrap();
    a.allocate(10, "a").unwrap();
    b.allocate(20, "b").unwrap();

    kernel.shutdown();

    assert_eq!(a.state(), ProcessState::Terminated);
    assert_eq!(b.state(), ProcessState::Terminated);
    assert!(kernel.processes().is_empty());
    assert_eq!(kernel.memory_stats().unwrap().used, 0);
    // Filesystem stays up
    assert!(kernel.stat("/etc/motd").is_ok());
}

#[tokio::test]
async fn test_concurrent_processes_interleave() {
    let (_hal, kernel) = boot();
    let journal = Rc::new(RefCell::new(Vec::new()));

    let spawn = |tag: &str| {
        let journal = journal.clone();
        kernel
            .create_process(
                move || RoundsApp {
                    journal: journal.clone(),
                },
                json!({ "tag": tag }),
            )
            .unwrap()
    };
    let a = spawn("a");
    let b = spawn("b");

    let (ra, rb) = tokio::join!(a.start(), b.start());
    assert_eq!(ra.unwrap(), json!({"blocks": 3}));
    assert_eq!(rb.unwrap(), json!({"blocks": 3}));

    // Neither app ran to completion before the other got a turn
    let journal = journal.borrow();
    assert_eq!(journal.len(), 6);
    assert_ne!(&journal[..3], &["a0", "a1", "a2"]);
    assert_ne!(&journal[..3], &["b0", "b1", "b2"]);

    assert_eq!(a.state(), ProcessState::Terminated);
    assert_eq!(b.state(), ProcessState::Terminated);
    assert_eq!(kernel.memory_stats().unwrap().used, 0);
    assert_eq!(kernel.system_info().processes, 0);
    for tag in ["a", "b"] {
        for round in 0..3 {
            let path = format!("/tmp/{}-{}", tag, round);
            assert_eq!(kernel.read_file(&path).await.unwrap(), tag);
        }
    }
}
