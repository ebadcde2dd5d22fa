//! Periodic subscription diagnostics.
//!
//! An independent observer task — not wired into the registry — that logs
//! every connection's registered subscriptions at a configured interval.
//! Operational aid only; disabled when the interval is zero.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::websocket::registry::ConnectionRegistry;

/// Log registered subscriptions every `interval` until cancelled.
///
/// Callers are expected to skip spawning this when the configured interval
/// is zero.
pub async fn run_subscription_logger(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    let _ = ticker.tick().await;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("subscription logger stopped");
                return;
            }
            _ = ticker.tick() => {
                registry.log_subscriptions().await;
            }
        }
    }
}
