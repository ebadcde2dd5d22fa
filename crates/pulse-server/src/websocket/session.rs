//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use super::connection::ClientConnection;
use super::handler::{Disposition, handle_frame};
use super::registry::ConnectionRegistry;
use crate::metrics::{
    WS_CONNECTION_DURATION_SECONDS, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};

/// Outbound frames buffered per connection before drops start.
const OUTBOUND_BUFFER: usize = 1024;

/// Run a WebSocket session for a connected client.
///
/// 1. Attaches the connection to the registry (fresh subscriber)
/// 2. Spawns a writer task draining the bounded outbound channel
/// 3. Dispatches inbound frames in receipt order
/// 4. Detaches on disconnect, discarding all the connection's subscriptions
#[instrument(skip_all, fields(conn_id = %connection_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    connection_id: String,
    registry: Arc<ConnectionRegistry>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);
    let connection = Arc::new(ClientConnection::new(connection_id.clone(), send_tx));
    let subscriber = registry.attach(connection.clone()).await;

    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);

    // Writer task: the only owner of the socket's sink half.
    let writer = tokio::spawn(async move {
        while let Some(text) = send_rx.recv().await {
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let ctx = super::handler::DispatchContext {
        connection: connection.clone(),
        subscriber,
        registry: registry.clone(),
    };

    while let Some(Ok(message)) = ws_rx.next().await {
        let text = match message {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => text.to_owned(),
                Err(_) => {
                    warn!(len = data.len(), "non-UTF8 binary frame, closing connection");
                    break;
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => continue,
        };

        match handle_frame(&text, &ctx).await {
            Disposition::Reply(frame) => {
                if !connection.send_frame(&frame) {
                    warn!("failed to enqueue reply (channel full or closed)");
                }
            }
            Disposition::Silent => {}
            Disposition::Close => break,
        }
    }

    registry.detach(&connection_id).await;
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
    writer.abort();
    info!("session closed");
}
