//! The pub/sub backend seam.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::BackendError;

/// A connection to the external pub/sub backend.
///
/// Messages are JSON text; the transport does all encoding and decoding.
/// `subscribe` hands back a bounded receiver — when the underlying broker
/// connection dies, implementations close the channel, and the bridge
/// re-subscribes.
#[async_trait]
pub trait PubSubBackend: Send + Sync {
    /// Publish a message on a channel.
    async fn publish(&self, channel: &str, message: String) -> Result<(), BackendError>;

    /// Subscribe to a channel, receiving every message published on it
    /// from now on.
    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BackendError>;
}
