//! Terminal front end.

pub mod command;
pub mod repl;

pub use command::Command;
pub use repl::{Repl, Tab, spawn_stdin_reader};
