//! Collage App Library
//!
//! Headless shell for the Collage editor: argument parsing, command
//! dispatch against a file-backed session, and the system clipboard.

pub mod cli;
pub mod clipboard;
pub mod commands;

pub use cli::{Cli, CliCommand};
pub use clipboard::system_clipboard;
pub use commands::{AppError, execute, run};
