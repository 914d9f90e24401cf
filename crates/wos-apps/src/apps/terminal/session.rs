//! Terminal session.
//!
//! Holds the working directory and history, and executes parsed commands
//! against a kernel handle. Command failures never end the session; they
//! come back as `error: ...` text.

use wos_hal::HAL;
use wos_kernel::{Kernel, KernelError, ProcessId};
use wos_vfs::{resolve_path, VfsError};

use super::command::{Command, ParseError};
use super::format::{format_bytes, format_timestamp};

/// Initial working directory, and the target of a bare `cd`.
pub const HOME_DIR: &str = "/home";

/// The only user there is.
pub const USER: &str = "user";

/// Result of executing one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Nothing to print
    Empty,
    /// Text to print (may span several lines)
    Text(String),
    /// Clear the screen
    Clear,
    /// End the session
    Exit,
}

/// Errors surfaced to the user as `error: ...` lines.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Path(#[from] VfsError),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("{0}: not a directory")]
    NotADirectory(String),
}

/// Interactive command session bound to a kernel.
pub struct Session<H: HAL> {
    kernel: Kernel<H>,
    /// Process the session runs in, if any
    owner: Option<ProcessId>,
    cwd: String,
    history: Vec<String>,
}

impl<H: HAL> Session<H> {
    pub fn new(kernel: Kernel<H>) -> Self {
        Self {
            kernel,
            owner: None,
            cwd: String::from(HOME_DIR),
            history: Vec::new(),
        }
    }

    /// Attribute this session to a process (shown by `ps`).
    pub fn with_owner(mut self, pid: ProcessId) -> Self {
        self.owner = Some(pid);
        self
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn prompt(&self) -> String {
        format!("{}@webos:{}$ ", USER, self.cwd)
    }

    /// Execute one input line. Blank lines are ignored and not recorded.
    pub async fn execute_line(&mut self, line: &str) -> Response {
        let line = line.trim();
        if line.is_empty() {
            return Response::Empty;
        }
        self.history.push(line.to_string());

        let result = match Command::parse(line) {
            Ok(command) => self.execute(command).await,
            Err(e) => Err(SessionError::from(e)),
        };

        result.unwrap_or_else(|e| {
            log::debug!("[terminal] '{}' failed: {}", line, e);
            Response::Text(format!("error: {}", e))
        })
    }

    /// Execute a parsed command.
    pub async fn execute(&mut self, command: Command) -> Result<Response, SessionError> {
        let response = match command {
            Command::Help => Response::Text(Command::help_text()),
            Command::Ls { path } => self.list(path.as_deref()).await?,
            Command::Cd { path } => self.change_directory(path.as_deref())?,
            Command::Pwd => Response::Text(self.cwd.clone()),
            Command::Echo { text } => Response::Text(text),
            Command::Clear => Response::Clear,
            Command::Date => Response::Text(format_timestamp(self.kernel.now())),
            Command::Whoami => Response::Text(String::from(USER)),

            Command::Cat { path } => {
                let path = self.resolve(&path)?;
                Response::Text(self.kernel.read_file(&path).await?)
            }
            Command::Mkdir { path } => {
                let path = self.resolve(&path)?;
                self.kernel.create_directory(&path).await?;
                Response::Text(format!("created directory {}", path))
            }
            Command::Touch { path } => {
                let path = self.resolve(&path)?;
                self.kernel.write_file(&path, "").await?;
                Response::Text(format!("created file {}", path))
            }
            Command::Rm { path } => {
                let path = self.resolve(&path)?;
                self.kernel.delete_file(&path).await?;
                Response::Text(format!("removed {}", path))
            }

            Command::Ps => Response::Text(self.process_report()),
            Command::Mem => Response::Text(self.memory_report()?),
            Command::History => Response::Text(self.history_report()),
            Command::Exit => Response::Exit,
            Command::Unknown { cmd } => Response::Text(format!(
                "{}: command not found (type 'help' for a list of commands)",
                cmd
            )),
        };
        Ok(response)
    }

    fn resolve(&self, input: &str) -> Result<String, SessionError> {
        Ok(resolve_path(&self.cwd, input)?)
    }

    async fn list(&self, path: Option<&str>) -> Result<Response, SessionError> {
        let path = match path {
            Some(p) => self.resolve(p)?,
            None => self.cwd.clone(),
        };

        let entries = self.kernel.list_directory(&path).await?;
        if entries.is_empty() {
            return Ok(Response::Text(String::from("directory is empty")));
        }

        let lines: Vec<String> = entries
            .iter()
            .map(|e| {
                if e.is_directory {
                    format!("{}/", e.name)
                } else {
                    format!("{:<24} {}", e.name, format_bytes(e.size))
                }
            })
            .collect();
        Ok(Response::Text(lines.join("\n")))
    }

    fn change_directory(&mut self, path: Option<&str>) -> Result<Response, SessionError> {
        let target = self.resolve(path.unwrap_or(HOME_DIR))?;
        let entry = self.kernel.stat(&target)?;
        if !entry.is_directory {
            return Err(SessionError::NotADirectory(target));
        }
        self.cwd = target;
        Ok(Response::Empty)
    }

    fn process_report(&self) -> String {
        let info = self.kernel.system_info();
        let mut lines = vec![format!("active processes: {}", info.processes)];

        lines.push(format!("{:>5}  {:<10}  {}", "PID", "STATE", "NAME"));
        for process in self.kernel.processes() {
            let marker = if Some(process.pid) == self.owner { "*" } else { "" };
            lines.push(format!(
                "{:>5}  {:<10}  {}{}",
                process.pid.0,
                process.state.as_str(),
                process.app_name.as_deref().unwrap_or("-"),
                marker
            ));
        }

        if let Some(memory) = info.memory {
            lines.push(format!(
                "memory: {} used, {} free",
                format_bytes(memory.used),
                format_bytes(memory.free)
            ));
        }
        lines.join("\n")
    }

    fn memory_report(&self) -> Result<String, SessionError> {
        let stats = self
            .kernel
            .memory_stats()
            .ok_or(KernelError::SystemNotReady)?;

        let mut lines = vec![
            String::from("memory:"),
            format!("  total:  {} bytes", stats.total),
            format!("  used:   {} bytes", stats.used),
            format!("  free:   {} bytes", stats.free),
            format!("  blocks: {}", stats.block_count),
        ];

        if let Some(pid) = self.owner {
            let owned: u64 = self.kernel.blocks_owned_by(pid).iter().map(|b| b.size).sum();
            lines.push(format!("  this session (PID {}): {}", pid, format_bytes(owned)));
        }
        Ok(lines.join("\n"))
    }

    fn history_report(&self) -> String {
        self.history
            .iter()
            .enumerate()
            .map(|(i, cmd)| format!("{:>4}  {}", i + 1, cmd))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
