//! Connection registry: connection id → subscriber, plus the fan-out entry
//! points invoked by the pub/sub bridge.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{counter, gauge};
use pulse_gateway::{DocumentParser, HandlerRegistry};
use pulse_proto::channel::EventMessage;
use pulse_proto::frames::ServerFrame;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::connection::ClientConnection;
use super::subscriber::Subscriber;
use crate::metrics::{KEEPALIVES_SENT_TOTAL, SUBSCRIPTIONS_ACTIVE};

struct Entry {
    connection: Arc<ClientConnection>,
    subscriber: Arc<Subscriber>,
}

/// Exclusive owner of the connection → subscriber mapping.
///
/// Attach and detach are the only mutations; both are idempotent-safe.
/// Broadcast takes a snapshot of the map and fans out per connection
/// concurrently, so one connection's pending execution never stalls the
/// others.
pub struct ConnectionRegistry {
    parser: Arc<dyn DocumentParser>,
    handlers: Arc<HandlerRegistry>,
    connections: RwLock<HashMap<String, Entry>>,
    /// Tracked separately so count queries never take the map lock.
    active_count: AtomicUsize,
}

impl ConnectionRegistry {
    /// Create an empty registry over the given gateway seams.
    pub fn new(parser: Arc<dyn DocumentParser>, handlers: Arc<HandlerRegistry>) -> Self {
        Self {
            parser,
            handlers,
            connections: RwLock::new(HashMap::new()),
            active_count: AtomicUsize::new(0),
        }
    }

    /// Insert a fresh subscriber for a newly opened connection and return
    /// it. Called exactly once per physical connection, before any
    /// subscribe traffic is dispatched for it.
    pub async fn attach(&self, connection: Arc<ClientConnection>) -> Arc<Subscriber> {
        let subscriber = Arc::new(Subscriber::new(
            self.parser.clone(),
            self.handlers.clone(),
        ));
        let conn_id = connection.id.clone();
        let entry = Entry {
            connection,
            subscriber: subscriber.clone(),
        };

        let mut connections = self.connections.write().await;
        if connections.insert(conn_id.clone(), entry).is_none() {
            let _ = self.active_count.fetch_add(1, Ordering::Relaxed);
        }
        info!(
            conn_id,
            connected = connections.len(),
            "client attached"
        );
        subscriber
    }

    /// Remove a connection and discard all its subscriptions. Idempotent.
    pub async fn detach(&self, connection_id: &str) {
        let removed = self.connections.write().await.remove(connection_id);
        if let Some(entry) = removed {
            let _ = self.active_count.fetch_sub(1, Ordering::Relaxed);
            let discarded = entry.subscriber.subscription_count();
            if discarded > 0 {
                #[allow(clippy::cast_precision_loss)]
                gauge!(SUBSCRIPTIONS_ACTIVE).decrement(discarded as f64);
            }
            info!(conn_id = connection_id, discarded, "client detached");
        }
    }

    /// Look up the subscriber for a connection id. `None` is a normal
    /// outcome (already-detached race), not an error.
    pub async fn find(&self, connection_id: &str) -> Option<Arc<Subscriber>> {
        self.connections
            .read()
            .await
            .get(connection_id)
            .map(|e| e.subscriber.clone())
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    /// Registered subscriptions across all connections.
    pub async fn subscription_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections
            .values()
            .map(|e| e.subscriber.subscription_count())
            .sum()
    }

    /// Fan an application event out to every attached connection.
    ///
    /// Connections are processed concurrently; within one connection its
    /// matching subscriptions are pushed in order.
    pub async fn broadcast(&self, event: &EventMessage) {
        let snapshot: Vec<(Arc<ClientConnection>, Arc<Subscriber>)> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .map(|e| (e.connection.clone(), e.subscriber.clone()))
                .collect()
        };
        debug!(
            trigger = event.event,
            connections = snapshot.len(),
            "broadcasting event"
        );

        let passes = snapshot
            .iter()
            .map(|(connection, subscriber)| subscriber.broadcast(connection, event));
        let _: Vec<()> = futures::future::join_all(passes).await;
    }

    /// Push a `keepalive` frame to every attached connection.
    pub async fn keepalive_all(&self) {
        let snapshot: Vec<Arc<ClientConnection>> = {
            let connections = self.connections.read().await;
            connections.values().map(|e| e.connection.clone()).collect()
        };
        for connection in &snapshot {
            if connection.send_frame(&ServerFrame::Keepalive) {
                counter!(KEEPALIVES_SENT_TOTAL).increment(1);
            }
        }
        debug!(connections = snapshot.len(), "keepalive pushed");
    }

    /// Log every connection's registered subscriptions (diagnostics).
    pub async fn log_subscriptions(&self) {
        let connections = self.connections.read().await;
        for (conn_id, entry) in connections.iter() {
            let summaries = entry.subscriber.summaries();
            if summaries.is_empty() {
                info!(conn_id, "no subscriptions for connection");
            } else {
                info!(conn_id, subscriptions = ?summaries, "active subscriptions");
            }
        }
    }
}
