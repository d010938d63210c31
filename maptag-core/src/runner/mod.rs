//! External command execution
//!
//! The lookup table comes from the standard output of an external program.
//! [`CommandRunner`] is the seam between the engine and the process table:
//!
//! - `ProcessRunner`: spawns the program with `std::process::Command`
//! - `MockRunner`: returns canned output and records every call, for tests

mod mock;
mod process;

pub use mock::{MockRunner, RecordedCall};
pub use process::ProcessRunner;

use crate::error::Result;

/// Runs an external command and captures its standard output
///
/// Implementations must return [`MaptagError::CommandExecution`] when the
/// program cannot be started, exits unsuccessfully, or prints something that
/// is not UTF-8.
///
/// [`MaptagError::CommandExecution`]: crate::error::MaptagError::CommandExecution
pub trait CommandRunner: Send + Sync {
    /// Run `command` with `args` and return its standard output
    fn run(&self, command: &str, args: &[String]) -> Result<String>;

    /// Runner name (for logging)
    fn name(&self) -> &'static str;
}
