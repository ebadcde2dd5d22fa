//! Client-facing error payloads and subscribe-time error classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One error entry in a `subscription_fail` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    /// Human-readable message.
    pub message: String,
}

impl ErrorEntry {
    /// Build an entry from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The `payload` object of a `subscription_fail` frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error list; never empty for a rejected subscription.
    pub errors: Vec<ErrorEntry>,
}

impl ErrorPayload {
    /// Build a payload from plain messages.
    pub fn from_messages(messages: Vec<String>) -> Self {
        Self {
            errors: messages.into_iter().map(ErrorEntry::new).collect(),
        }
    }
}

/// Why a `subscription_start` was rejected.
///
/// The two kinds are reported identically on the wire but are kept distinct
/// so callers can log and meter them separately: an invalid query is a
/// client bug, a denial is a policy outcome.
#[derive(Debug, Error)]
pub enum SubscribeError {
    /// The document failed to parse or validate against the schema.
    #[error("invalid subscription query")]
    InvalidQuery(Vec<ErrorEntry>),

    /// The authorization hook declined the subscription.
    #[error("unable to subscribe to [{trigger}]")]
    Unprocessable {
        /// Trigger name the client asked for.
        trigger: String,
    },
}

impl SubscribeError {
    /// Convert into the wire payload for a `subscription_fail` frame.
    pub fn to_payload(&self) -> ErrorPayload {
        match self {
            Self::InvalidQuery(errors) => ErrorPayload {
                errors: errors.clone(),
            },
            Self::Unprocessable { .. } => ErrorPayload {
                errors: vec![ErrorEntry::new(self.to_string())],
            },
        }
    }
}

/// A channel message that could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not valid JSON, or neither an event nor a marker.
    #[error("malformed channel message: {0}")]
    Malformed(String),
    /// A `type` marker other than `keepalive`.
    #[error("unknown channel marker type `{0}`")]
    UnknownMarker(String),
}
