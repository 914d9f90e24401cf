//! WebOS Applications
//!
//! Applications that run as managed processes on the WebOS kernel. Each
//! implements [`wos_kernel::App`] and talks to the system only through the
//! kernel handle carried by its process.
//!
//! The `wos-terminal` binary boots a kernel over directory-backed storage
//! and runs the [`TerminalApp`] against stdin/stdout.

pub mod apps;

pub use apps::terminal::{Command, ParseError, Response, Session, SessionError, SharedOutput};
pub use apps::TerminalApp;
