//! Built-in applications.

pub mod terminal;

pub use terminal::TerminalApp;
