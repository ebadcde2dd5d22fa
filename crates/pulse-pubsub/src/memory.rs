//! In-process pub/sub backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::backend::PubSubBackend;
use crate::errors::BackendError;

/// Per-channel fan-out buffer size.
const CHANNEL_CAPACITY: usize = 1024;

/// Pub/sub backend backed by per-channel `tokio::sync::broadcast` senders.
///
/// Every subscriber gets its own bounded receiver fed by a forwarder task.
/// Subscribers that fall behind lose the oldest messages (logged, not
/// fatal) — the same at-least-once, no-replay contract an external broker
/// gives us.
pub struct MemoryBackend {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock();
        channels
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubBackend for MemoryBackend {
    async fn publish(&self, channel: &str, message: String) -> Result<(), BackendError> {
        // A send error only means nobody is subscribed right now; events
        // with no audience are dropped, matching broker semantics.
        let _ = self.sender(channel).send(message);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<String>, BackendError> {
        let mut rx = self.sender(channel).subscribe();
        let (tx, out) = mpsc::channel(CHANNEL_CAPACITY);
        let channel = channel.to_owned();

        drop(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(channel, lagged = n, "memory backend subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        Ok(out)
    }
}
