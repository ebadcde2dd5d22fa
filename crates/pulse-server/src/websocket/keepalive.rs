//! Keep-alive timer.
//!
//! The timer never writes frames itself: it publishes the keep-alive marker
//! onto the shared channel, and every process's bridge (including this
//! one's) reacts by pushing `keepalive` frames to its local connections.
//! That keeps the whole fleet's keep-alive cadence on one tick source.

use std::sync::Arc;
use std::time::Duration;

use pulse_proto::channel::ChannelMessage;
use pulse_pubsub::PubSubBackend;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Publish the keep-alive marker every `interval` until cancelled.
///
/// Callers are expected to skip spawning this when the configured interval
/// is zero.
pub async fn run_keepalive(
    backend: Arc<dyn PubSubBackend>,
    channel: String,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    // Consume the immediate first tick; the first marker goes out one full
    // interval after startup.
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("keep-alive timer stopped");
                return;
            }
            _ = ticker.tick() => {
                if let Err(e) = backend
                    .publish(&channel, ChannelMessage::keepalive_marker())
                    .await
                {
                    warn!(error = %e, "keep-alive publish failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_pubsub::MemoryBackend;

    #[tokio::test(start_paused = true)]
    async fn marker_published_each_interval() {
        let backend = Arc::new(MemoryBackend::new());
        let mut rx = backend.subscribe("ka").await.unwrap();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_keepalive(
            backend.clone(),
            "ka".to_owned(),
            Duration::from_secs(30),
            cancel.clone(),
        ));

        for _ in 0..3 {
            let raw = rx.recv().await.unwrap();
            assert!(matches!(
                ChannelMessage::decode(&raw).unwrap(),
                ChannelMessage::Keepalive
            ));
        }

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn no_marker_before_first_interval() {
        let backend = Arc::new(MemoryBackend::new());
        let mut rx = backend.subscribe("ka").await.unwrap();
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_keepalive(
            backend.clone(),
            "ka".to_owned(),
            Duration::from_secs(30),
            cancel.clone(),
        ));

        // Let the task start and consume its immediate tick.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancel_stops_the_timer() {
        let backend = Arc::new(MemoryBackend::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_keepalive(
            backend,
            "ka".to_owned(),
            Duration::from_secs(600),
            cancel.clone(),
        ));

        cancel.cancel();
        handle.await.unwrap();
    }
}
