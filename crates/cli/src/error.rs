//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// The replica call failed after retries
    #[error("Task {sequence} failed: {message}")]
    TaskFailed { sequence: i64, message: String },

    /// Not every submitted task produced a response in time
    #[error("Timed out after {received} of {expected} responses")]
    Timeout { received: usize, expected: usize },

    /// Stopped by Ctrl+C before every response arrived
    #[error("Interrupted after {received} of {expected} responses")]
    Interrupted { received: usize, expected: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn task_failed(sequence: i64, message: impl Into<String>) -> Self {
        Self::TaskFailed {
            sequence,
            message: message.into(),
        }
    }
}
