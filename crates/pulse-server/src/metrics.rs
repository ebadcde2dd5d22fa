//! Prometheus metrics recorder and metric name constants.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the `/metrics` endpoint. Must be
/// called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Active registered subscriptions (gauge).
pub const SUBSCRIPTIONS_ACTIVE: &str = "subscriptions_active";
/// Rejected subscribe requests total (counter, labels: reason).
pub const SUBSCRIBE_FAILURES_TOTAL: &str = "subscribe_failures_total";
/// Application events dispatched by the bridge (counter).
pub const BROADCAST_EVENTS_TOTAL: &str = "broadcast_events_total";
/// Data frames delivered to clients (counter).
pub const BROADCAST_DELIVERIES_TOTAL: &str = "broadcast_deliveries_total";
/// Frames dropped on full outbound channels (counter).
pub const BROADCAST_DROPS_TOTAL: &str = "broadcast_drops_total";
/// Gateway execution failures during broadcast (counter).
pub const EXECUTION_FAILURES_TOTAL: &str = "execution_failures_total";
/// Keep-alive frames pushed to clients (counter).
pub const KEEPALIVES_SENT_TOTAL: &str = "keepalives_sent_total";
/// Channel messages received by the bridge (counter).
pub const BRIDGE_MESSAGES_TOTAL: &str = "bridge_messages_total";
/// Channel messages dropped as undecodable (counter).
pub const BRIDGE_DECODE_FAILURES_TOTAL: &str = "bridge_decode_failures_total";
