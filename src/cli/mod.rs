//! Command-line interface module.

mod args;
pub mod classify;
pub mod common;
pub mod conflicts;
pub mod list;
pub mod watch;

pub use args::{Cli, Commands};
