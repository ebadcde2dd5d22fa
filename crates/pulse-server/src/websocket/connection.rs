//! WebSocket client connection state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use pulse_proto::frames::ServerFrame;
use tokio::sync::mpsc;
use tracing::warn;

/// Send handle for one connected client.
///
/// The socket itself is owned by the session's writer task; everything else
/// holds this handle and enqueues text frames on a bounded channel. A full
/// or closed channel makes `send` return `false` — the frame is dropped and
/// counted, never awaited on.
pub struct ClientConnection {
    /// Unique connection id (registry key).
    pub id: String,
    /// Channel to the connection's writer task.
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Frames dropped due to a full or closed channel.
    dropped_frames: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection handle.
    pub fn new(id: String, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Enqueue raw frame text.
    ///
    /// Returns `false` (and counts the drop) when the channel is full or
    /// the writer task is gone.
    pub fn send(&self, text: String) -> bool {
        if self.tx.try_send(text).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Encode and enqueue a protocol frame.
    pub fn send_frame(&self, frame: &ServerFrame) -> bool {
        match frame.encode() {
            Ok(text) => self.send(text),
            Err(e) => {
                warn!(conn_id = %self.id, error = %e, "failed to encode frame");
                false
            }
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_proto::frames::SubscriptionId;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(32);
        (ClientConnection::new("conn_1".into(), tx), rx)
    }

    #[tokio::test]
    async fn send_delivers_to_writer() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send("hello".into()));
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_to_closed_channel_counts_drop() {
        let (tx, rx) = mpsc::channel(32);
        let conn = ClientConnection::new("conn_2".into(), tx);
        drop(rx);

        assert!(!conn.send("hello".into()));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_to_full_channel_counts_drop() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new("conn_3".into(), tx);

        assert!(conn.send("first".into()));
        assert!(!conn.send("second".into()));
        assert_eq!(conn.drop_count(), 1);
    }

    #[tokio::test]
    async fn send_frame_encodes_json() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send_frame(&ServerFrame::SubscriptionSuccess {
            id: SubscriptionId::Number(1),
        }));

        let text = rx.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "subscription_success");
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn age_increases() {
        let (conn, _rx) = make_connection();
        let first = conn.age();
        std::thread::sleep(Duration::from_millis(5));
        assert!(conn.age() > first);
    }
}
