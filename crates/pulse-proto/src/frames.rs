//! Client and server frames, matching the `graphql-subscriptions` WebSocket
//! protocol: JSON objects discriminated by a `type` field.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ErrorPayload;

/// Client-chosen subscription identifier, unique per connection.
///
/// Clients send either a JSON number or a string; the server never interprets
/// the value, it only keys the per-connection registry with it and echoes it
/// back in responses and data frames.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubscriptionId {
    /// Numeric id (`{"id": 1}`).
    Number(u64),
    /// String id (`{"id": "sub-1"}`).
    Text(String),
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for SubscriptionId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for SubscriptionId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

/// Frame received from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Connection handshake; always acknowledged with `init_success`.
    Init,
    /// Register a subscription under a client-chosen id.
    SubscriptionStart {
        /// Id the client uses to correlate responses and data frames.
        id: SubscriptionId,
        /// Subscription document text.
        query: String,
        /// Decoded operation variables.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        variables: Option<Value>,
        /// Operation name hint; the trigger name is resolved from the
        /// document itself, this field is accepted for protocol
        /// compatibility.
        #[serde(
            rename = "operationName",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        operation_name: Option<String>,
    },
    /// Remove a subscription. Unknown ids are a no-op.
    SubscriptionEnd {
        /// Id supplied at `subscription_start`.
        id: SubscriptionId,
    },
    /// Ask the server to push a keep-alive frame to every connection now.
    KeepAlive,
}

impl ClientFrame {
    /// Parse a frame from raw message text.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Frame sent to a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake acknowledgement.
    InitSuccess,
    /// The subscription was registered.
    SubscriptionSuccess {
        /// Echoed client id.
        id: SubscriptionId,
    },
    /// The subscription was rejected.
    SubscriptionFail {
        /// Echoed client id.
        id: SubscriptionId,
        /// Error list for the client to display.
        payload: ErrorPayload,
    },
    /// Execution result for one registered subscription.
    SubscriptionData {
        /// Echoed client id.
        id: SubscriptionId,
        /// Gateway execution result.
        payload: Value,
    },
    /// No-op frame keeping idle connections open.
    Keepalive,
}

impl ServerFrame {
    /// Serialize the frame to JSON text.
    ///
    /// Frames are plain data; serialization only fails if a `payload`
    /// contains a non-string map key, which the gateway never produces.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
