//! Layered error definitions
//!
//! Categorized by source: config / invocation

use thiserror::Error;

/// Unified error type for configuration and setup
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Topology Errors =====
    /// Topology watcher could not be set up
    #[error("topology error for function '{function}': {message}")]
    Topology { function: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create topology setup error
    pub fn topology(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Topology {
            function: function.into(),
            message: message.into(),
        }
    }
}

/// Failure of one Invocation Unit call
///
/// Produced only after the retry budget is spent (or immediately for
/// failures that retrying cannot fix). Workers never propagate it; they
/// attach it to a [`crate::TaskResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// Connector could not be configured (bad method, client build failure)
    #[error("invoker setup error: {message}")]
    Setup { message: String },

    /// The request could not be built (bad URL)
    #[error("failed to build request for '{address}': {message}")]
    Request { address: String, message: String },

    /// Connection-level failure on every attempt
    #[error("transport error calling '{address}' after {attempts} attempt(s): {message}")]
    Transport {
        address: String,
        attempts: u32,
        message: String,
    },

    /// Replica kept answering with a server error
    #[error("'{address}' returned status {status} after {attempts} attempt(s)")]
    ServerStatus {
        address: String,
        attempts: u32,
        status: u16,
    },

    /// Response arrived but its body could not be read
    #[error("failed to read response body from '{address}': {message}")]
    Body { address: String, message: String },
}

impl InvokeError {
    /// Create connector setup error
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Create request build error
    pub fn request(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create transport error
    pub fn transport(address: impl Into<String>, attempts: u32, message: impl Into<String>) -> Self {
        Self::Transport {
            address: address.into(),
            attempts,
            message: message.into(),
        }
    }

    /// Create body read error
    pub fn body(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Body {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Number of attempts made before giving up, when known
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Transport { attempts, .. } | Self::ServerStatus { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoke_error_display() {
        let err = InvokeError::ServerStatus {
            address: "10.0.0.1:8080".to_string(),
            attempts: 6,
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "'10.0.0.1:8080' returned status 503 after 6 attempt(s)"
        );
        assert_eq!(err.attempts(), Some(6));
        assert_eq!(InvokeError::body("a", "eof").attempts(), None);
    }

    #[test]
    fn test_config_validation_display() {
        let err = ContractError::config_validation("router.workers", "must be >= 1");
        assert!(err.to_string().contains("router.workers"));
    }
}
