//! Subprocess-backed command runner

use std::process::{Command, Stdio};

use crate::error::{MaptagError, Result};
use crate::runner::CommandRunner;

/// Runs commands as child processes
///
/// Stdin is closed, stdout is captured, stderr is captured and quoted in the
/// error message on failure. There is no timeout: a command that never exits
/// blocks the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a process runner
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &str, args: &[String]) -> Result<String> {
        let failed = |reason: String| MaptagError::CommandExecution {
            command: command.to_string(),
            reason,
        };

        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            return Err(failed(if stderr.is_empty() {
                output.status.to_string()
            } else {
                format!("{}: {}", output.status, stderr)
            }));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| failed(format!("output is not valid UTF-8: {}", e)))
    }

    fn name(&self) -> &'static str {
        "process"
    }
}
