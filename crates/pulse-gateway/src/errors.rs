//! Gateway error types.

use thiserror::Error;

/// A schema validation error for one subscription document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationError {
    /// Human-readable description, forwarded verbatim to the client.
    pub message: String,
}

impl ValidationError {
    /// Build an error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors surfaced by gateway implementations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The document text is not syntactically valid.
    #[error("failed to parse subscription document: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },

    /// Executing a stored subscription failed.
    #[error("subscription execution failed: {message}")]
    Execution {
        /// Executor diagnostic.
        message: String,
    },
}

impl GatewayError {
    /// Build a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Build an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}
