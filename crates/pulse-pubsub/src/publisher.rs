//! Application-facing event publisher.

use std::sync::Arc;

use pulse_proto::channel::EventMessage;
use serde_json::Value;
use tracing::debug;

use crate::backend::PubSubBackend;
use crate::errors::BackendError;

/// Publishes application events into the shared channel.
///
/// This is the only way application-originated events enter the fan-out
/// path; any number of publishers across any number of processes may use
/// the same channel concurrently.
pub struct EventPublisher {
    backend: Arc<dyn PubSubBackend>,
    channel: String,
}

impl EventPublisher {
    /// Create a publisher bound to one channel.
    pub fn new(backend: Arc<dyn PubSubBackend>, channel: impl Into<String>) -> Self {
        Self {
            backend,
            channel: channel.into(),
        }
    }

    /// The channel this publisher writes to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Publish one payload under each of the given event names.
    ///
    /// Every name becomes its own `{event, data}` channel message, so a
    /// payload can fan out to several triggers at once.
    pub async fn publish<S: AsRef<str>>(
        &self,
        events: &[S],
        payload: &Value,
    ) -> Result<(), BackendError> {
        for name in events {
            let message = EventMessage::new(name.as_ref(), payload.clone())
                .encode()
                .map_err(BackendError::Encode)?;
            self.backend.publish(&self.channel, message).await?;
            debug!(event = name.as_ref(), channel = self.channel, "published event");
        }
        Ok(())
    }

    /// Publish one payload under a single event name.
    pub async fn publish_one(&self, event: &str, payload: &Value) -> Result<(), BackendError> {
        self.publish(&[event], payload).await
    }
}
