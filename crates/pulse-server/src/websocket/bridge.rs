//! Pub/sub bridge — turns shared-channel messages into local fan-out.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use pulse_proto::channel::ChannelMessage;
use pulse_pubsub::PubSubBackend;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::registry::ConnectionRegistry;
use crate::metrics::{
    BRIDGE_DECODE_FAILURES_TOTAL, BRIDGE_MESSAGES_TOTAL, BROADCAST_EVENTS_TOTAL,
};

/// Pause before re-establishing a lost channel subscription.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(1);

/// Subscribes to the shared channel and routes every inbound message:
/// keep-alive markers become local `keepalive` pushes, application events
/// go through [`ConnectionRegistry::broadcast`].
///
/// The bridge never dies with the backend — a lost subscription is retried
/// with a short pause until shutdown is signalled.
pub struct EventBridge {
    backend: Arc<dyn PubSubBackend>,
    channel: String,
    registry: Arc<ConnectionRegistry>,
    cancel: CancellationToken,
}

impl EventBridge {
    /// Create a bridge over the given backend and channel.
    pub fn new(
        backend: Arc<dyn PubSubBackend>,
        channel: impl Into<String>,
        registry: Arc<ConnectionRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            channel: channel.into(),
            registry,
            cancel,
        }
    }

    /// Run until shutdown. Never returns because of backend failures.
    #[instrument(skip_all, name = "event_bridge", fields(channel = %self.channel))]
    pub async fn run(self) {
        loop {
            let mut rx = match self.backend.subscribe(&self.channel).await {
                Ok(rx) => rx,
                Err(e) => {
                    warn!(error = %e, "channel subscribe failed, retrying");
                    if self.pause().await {
                        return;
                    }
                    continue;
                }
            };
            info!("subscribed to channel");

            loop {
                tokio::select! {
                    () = self.cancel.cancelled() => {
                        info!("bridge shutting down");
                        return;
                    }
                    message = rx.recv() => match message {
                        Some(text) => self.dispatch(&text).await,
                        None => {
                            warn!("channel stream ended, resubscribing");
                            break;
                        }
                    }
                }
            }

            if self.pause().await {
                return;
            }
        }
    }

    /// Sleep the resubscribe delay; `true` when shutdown arrived first.
    async fn pause(&self) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => true,
            () = tokio::time::sleep(RESUBSCRIBE_DELAY) => false,
        }
    }

    async fn dispatch(&self, text: &str) {
        counter!(BRIDGE_MESSAGES_TOTAL).increment(1);
        match ChannelMessage::decode(text) {
            Ok(ChannelMessage::Keepalive) => self.registry.keepalive_all().await,
            Ok(ChannelMessage::Event(event)) => {
                counter!(BROADCAST_EVENTS_TOTAL).increment(1);
                self.registry.broadcast(&event).await;
            }
            Err(e) => {
                counter!(BRIDGE_DECODE_FAILURES_TOTAL).increment(1);
                warn!(error = %e, "dropping undecodable channel message");
            }
        }
    }
}
