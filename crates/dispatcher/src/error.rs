//! Dispatcher error types

use contracts::{ContractError, InvokeError};
use thiserror::Error;

/// Dispatcher-specific errors
///
/// Invocation failures never show up here; they travel inside
/// [`contracts::TaskResponse::error`].
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Client used in the wrong mode
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Queue full under the reject policy
    #[error("task queue full, task {sequence} was not submitted")]
    QueueFull { sequence: i64 },

    /// Queue closed - no worker can ever receive the task
    #[error("task queue closed")]
    QueueClosed,

    /// Invoker could not be set up
    #[error("invoker setup failed: {0}")]
    Invoker(#[from] InvokeError),

    /// Topology watching could not be set up
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl DispatcherError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}
