//! WebOS Terminal
//!
//! Boots a WebOS kernel on the host and runs the terminal application as
//! its first process.
//!
//! Usage:
//!   wos-terminal [--data-dir DIR] [--config FILE] [--script FILE]
//!
//! Without a data directory (flag or `WOS_DATA_DIR`) the session runs on
//! in-memory storage and nothing survives exit.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use wos_apps::TerminalApp;
use wos_hal::{DirHal, MemoryHal, HAL};
use wos_kernel::{Kernel, KernelConfig};

#[derive(Parser, Debug)]
#[command(name = "wos-terminal")]
#[command(about = "Run the WebOS terminal on a simulated kernel")]
struct Args {
    /// Directory holding persisted kernel state
    #[arg(long, env = "WOS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON kernel configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run commands from a file (one per line) instead of stdin
    #[arg(long)]
    script: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<KernelConfig> {
    let Some(path) = path else {
        return Ok(KernelConfig::default());
    };
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    KernelConfig::from_json(&data)
        .with_context(|| format!("Invalid config {}", path.display()))
}

fn load_options(script: Option<&Path>) -> Result<Value> {
    let Some(path) = script else {
        return Ok(json!({}));
    };
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let lines: Vec<&str> = data.lines().collect();
    Ok(json!({ "script": lines }))
}

async fn run<H: HAL>(hal: Rc<H>, config: KernelConfig, options: Value) -> Result<()> {
    let kernel = Kernel::new(hal, config);
    kernel.initialize().context("Kernel failed to boot")?;

    let process = kernel
        .create_process(TerminalApp::stdio, options)
        .context("Failed to create terminal process")?;
    let result = process.start().await;

    kernel.shutdown();
    let summary = result.context("Terminal exited with an error")?;
    log::info!("[kernel] terminal result: {}", summary);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let options = load_options(args.script.as_deref())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    match args.data_dir {
        Some(dir) => {
            let hal = DirHal::open(&dir)
                .with_context(|| format!("Failed to open data directory {}", dir.display()))?;
            log::info!("[kernel] storage at {}", dir.display());
            runtime.block_on(run(Rc::new(hal), config, options))
        }
        None => {
            log::warn!("[kernel] no data directory set, state will not be persisted");
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default();
            runtime.block_on(run(Rc::new(MemoryHal::with_time(now)), config, options))
        }
    }
}
