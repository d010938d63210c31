//! Error types for maptag operations
//!
//! Every batch-level failure is a [`MaptagError`]. Each variant carries:
//! - A human-readable message
//! - A stable error code for programmatic handling
//! - A category for grouping
//!
//! Per-record lookup misses are not errors and never show up here.
//!
//! # Example
//!
//! ```rust
//! use maptag_core::error::{MaptagError, ErrorCategory};
//!
//! fn handle_error(err: MaptagError) {
//!     match err.category() {
//!         ErrorCategory::Validation => println!("Fix the configuration"),
//!         ErrorCategory::External => println!("Lookup command failed"),
//!         ErrorCategory::Internal => println!("Other error"),
//!     }
//!
//!     if err.is_recoverable() {
//!         println!("The next batch will retry the refresh");
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigIssue;

/// Result type alias for maptag operations
pub type Result<T> = std::result::Result<T, MaptagError>;

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration or pattern is invalid
    Validation,
    /// External command or I/O failed
    External,
    /// Serialization or other internal failure
    Internal,
}

/// Errors that abort a whole enrichment batch
#[derive(Error, Debug)]
pub enum MaptagError {
    /// One or more configuration keys are missing or malformed
    #[error("Invalid configuration: {}", join_issues(.issues))]
    Configuration { issues: Vec<ConfigIssue> },

    /// The lookup command could not be run or exited unsuccessfully
    #[error("Command '{command}' failed: {reason}")]
    CommandExecution { command: String, reason: String },

    /// The lookup pattern is not a valid regular expression
    #[error("Invalid pattern '{pattern}': {reason}")]
    PatternCompile { pattern: String, reason: String },

    /// Configuration names an addressing mode that does not exist
    #[error("Unknown addressing mode: '{mode}'. Expected one of: tag, ns_name, ns_value.")]
    UnknownAddressingMode { mode: String },

    /// JSON serialization or deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl MaptagError {
    /// Shorthand for a single-issue configuration error
    pub fn config(issue: ConfigIssue) -> Self {
        MaptagError::Configuration { issues: vec![issue] }
    }

    /// Returns true if repeating the call might succeed
    ///
    /// A failed command leaves the cache stale, so the next batch retries it.
    /// Configuration and pattern problems stay broken until fixed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MaptagError::CommandExecution { .. } | MaptagError::Io(_)
        )
    }

    /// Returns the error category for grouping
    pub fn category(&self) -> ErrorCategory {
        match self {
            MaptagError::Configuration { .. }
            | MaptagError::PatternCompile { .. }
            | MaptagError::UnknownAddressingMode { .. } => ErrorCategory::Validation,

            MaptagError::CommandExecution { .. } | MaptagError::Io(_) => ErrorCategory::External,

            MaptagError::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            MaptagError::Configuration { .. } => "INVALID_CONFIGURATION",
            MaptagError::CommandExecution { .. } => "COMMAND_EXECUTION_FAILED",
            MaptagError::PatternCompile { .. } => "PATTERN_COMPILE_FAILED",
            MaptagError::UnknownAddressingMode { .. } => "UNKNOWN_ADDRESSING_MODE",
            MaptagError::Json(_) => "JSON_ERROR",
            MaptagError::Io(_) => "IO_ERROR",
        }
    }

    /// Convert to a JSON-serializable error response
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                recoverable: self.is_recoverable(),
            },
        }
    }
}

/// JSON-serializable error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail for JSON responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error code (e.g., "PATTERN_COMPILE_FAILED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Error category
    pub category: ErrorCategory,
    /// Whether retry might succeed
    pub recoverable: bool,
}
