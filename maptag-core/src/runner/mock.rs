//! Mock command runner for testing
//!
//! Returns canned output and records every invocation for inspection.

use std::sync::RwLock;

use crate::error::{MaptagError, Result};
use crate::runner::CommandRunner;

/// A recorded command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Program that was run
    pub command: String,
    /// Arguments it was given
    pub args: Vec<String>,
}

/// Canned response
#[derive(Debug, Clone)]
enum Response {
    Output(String),
    Failure(String),
}

/// Mock runner that returns canned output
pub struct MockRunner {
    response: RwLock<Response>,
    calls: RwLock<Vec<RecordedCall>>,
}

impl MockRunner {
    /// Create a runner that always prints `output`
    pub fn new(output: &str) -> Self {
        Self {
            response: RwLock::new(Response::Output(output.to_string())),
            calls: RwLock::new(Vec::new()),
        }
    }

    /// Create a runner whose command always fails
    pub fn failing(reason: &str) -> Self {
        let runner = Self::new("");
        runner.set_failure(reason);
        runner
    }

    /// Change the output returned by subsequent calls
    pub fn set_output(&self, output: &str) {
        *self.response.write().unwrap() = Response::Output(output.to_string());
    }

    /// Make subsequent calls fail
    pub fn set_failure(&self, reason: &str) {
        *self.response.write().unwrap() = Response::Failure(reason.to_string());
    }

    /// All recorded calls, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of recorded calls
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new("")
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, command: &str, args: &[String]) -> Result<String> {
        self.calls.write().unwrap().push(RecordedCall {
            command: command.to_string(),
            args: args.to_vec(),
        });

        match &*self.response.read().unwrap() {
            Response::Output(out) => Ok(out.clone()),
            Response::Failure(reason) => Err(MaptagError::CommandExecution {
                command: command.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
