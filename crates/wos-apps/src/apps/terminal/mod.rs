//! Terminal Application
//!
//! Command-line interface for WebOS, run as a managed process.
//!
//! ## Console I/O
//!
//! - **Input**: lines come from the `"script"` array in the process options
//!   when present, otherwise from stdin. Scripted lines are echoed after
//!   the prompt so the transcript reads like an interactive session.
//! - **Output**: any `Write` sink; stdout for the host binary, a
//!   [`SharedOutput`] buffer in tests.
//!
//! The app stops at `exit` or end of input and reports how many commands
//! it ran.

mod command;
mod format;
mod session;

pub use command::{Command, ParseError};
pub use format::{format_bytes, format_timestamp};
pub use session::{Response, Session, SessionError, HOME_DIR, USER};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::rc::Rc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use wos_hal::HAL;
use wos_kernel::{App, AppError, AppFuture, Process};

/// ANSI clear-screen sequence
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Where input lines come from.
enum Input {
    Stdin(Lines<BufReader<Stdin>>),
    Script(VecDeque<String>),
}

impl Input {
    /// Parse `options.script`, falling back to stdin when absent.
    fn from_options(options: &Value) -> Result<Self, AppError> {
        let script = match options.get("script") {
            None | Some(Value::Null) => {
                return Ok(Input::Stdin(BufReader::new(tokio::io::stdin()).lines()))
            }
            Some(script) => script,
        };

        let lines = script
            .as_array()
            .ok_or_else(|| AppError::failed("options.script must be an array of strings"))?;
        lines
            .iter()
            .map(|line| {
                line.as_str()
                    .map(String::from)
                    .ok_or_else(|| AppError::failed("options.script must be an array of strings"))
            })
            .collect::<Result<VecDeque<_>, _>>()
            .map(Input::Script)
    }

    fn is_script(&self) -> bool {
        matches!(self, Input::Script(_))
    }

    /// Next line, or None at end of input. Waiting on stdin does not block
    /// other processes.
    async fn next_line(&mut self) -> Result<Option<String>, AppError> {
        match self {
            Input::Script(lines) => Ok(lines.pop_front()),
            Input::Stdin(lines) => lines
                .next_line()
                .await
                .map_err(|e| AppError::failed(format!("terminal input: {}", e))),
        }
    }
}

/// Cloneable in-memory output sink.
#[derive(Clone, Default)]
pub struct SharedOutput {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl SharedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Terminal application state
pub struct TerminalApp {
    output: Box<dyn Write>,
}

impl TerminalApp {
    pub const NAME: &'static str = "terminal";

    /// Terminal writing to `output`.
    pub fn new(output: Box<dyn Write>) -> Self {
        Self { output }
    }

    /// Terminal on the host's stdout.
    pub fn stdio() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    fn print(&mut self, text: &str) -> Result<(), AppError> {
        self.output
            .write_all(text.as_bytes())
            .and_then(|_| self.output.flush())
            .map_err(|e| AppError::failed(format!("terminal output: {}", e)))
    }

    fn println(&mut self, text: &str) -> Result<(), AppError> {
        self.print(text)?;
        self.print("\n")
    }

    async fn print_welcome<H: HAL>(&mut self, process: &Process<H>) -> Result<(), AppError> {
        self.println("Welcome to the WebOS terminal!")?;
        // A missing motd is not worth failing over
        if let Ok(motd) = process.kernel().read_file("/etc/motd").await {
            self.println(&motd)?;
        }
        self.println("Type 'help' for a list of commands.")
    }

    async fn run<H: HAL>(
        &mut self,
        process: Process<H>,
        options: Value,
    ) -> Result<Value, AppError> {
        let mut input = Input::from_options(&options)?;
        let echo = input.is_script();
        let mut session = Session::new(process.kernel().clone()).with_owner(process.pid());

        self.print_welcome(&process).await?;
        log::debug!("[terminal] PID {} started in {}", process.pid(), session.cwd());

        loop {
            self.print(&session.prompt())?;
            let line = match input.next_line().await? {
                Some(line) => line,
                None => {
                    self.println("")?;
                    break;
                }
            };
            if echo {
                self.println(&line)?;
            }

            match session.execute_line(&line).await {
                Response::Empty => {}
                Response::Text(text) => self.println(&text)?,
                Response::Clear => self.print(CLEAR_SCREEN)?,
                Response::Exit => break,
            }
        }

        log::info!(
            "[terminal] PID {} closed after {} commands",
            process.pid(),
            session.history().len()
        );
        Ok(json!({
            "message": "terminal closed",
            "commands": session.history().len(),
        }))
    }
}

impl<H: HAL> App<H> for TerminalApp {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn main<'a>(&'a mut self, process: Process<H>, options: Value) -> AppFuture<'a> {
        Box::pin(async move { self.run(process, options).await })
    }
}
