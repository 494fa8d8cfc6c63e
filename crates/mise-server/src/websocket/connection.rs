//! Per-client WebSocket connection state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A connected WebSocket client.
pub struct ClientConnection {
    /// Unique connection ID.
    pub id: String,
    /// Send channel to the client's socket write task.
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has shown signs of life since the last heartbeat
    /// check.
    pub is_alive: AtomicBool,
    /// When the last pong (or any activity) was observed.
    last_seen: Mutex<Instant>,
}

impl ClientConnection {
    /// Create a new connection.
    #[must_use]
    pub fn new(id: String, tx: mpsc::Sender<String>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_seen: Mutex::new(now),
        }
    }

    /// Send a text frame to the client.
    ///
    /// Returns `false` when the channel is full or closed; the frame is
    /// dropped; live subscriptions recover via the client's next catch-up.
    pub fn send(&self, message: String) -> bool {
        self.tx.try_send(message).is_ok()
    }

    /// Mark the connection as alive (pong or any inbound frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Check and reset the alive flag for the heartbeat loop.
    ///
    /// Returns `true` if the connection showed life since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Duration since the last sign of life.
    #[must_use]
    pub fn silent_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_connection() -> (ClientConnection, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(8);
        (ClientConnection::new("conn_1".into(), tx), rx)
    }

    #[tokio::test]
    async fn send_delivers_message() {
        let (conn, mut rx) = make_connection();
        assert!(conn.send("hello".into()));
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn send_to_closed_channel_returns_false() {
        let (tx, rx) = mpsc::channel(8);
        let conn = ClientConnection::new("conn_2".into(), tx);
        drop(rx);
        assert!(!conn.send("hello".into()));
    }

    #[tokio::test]
    async fn send_to_full_channel_returns_false() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = ClientConnection::new("conn_3".into(), tx);
        assert!(conn.send("first".into()));
        assert!(!conn.send("second".into()));
    }

    #[test]
    fn check_alive_resets_flag() {
        let (conn, _rx) = make_connection();
        assert!(conn.check_alive());
        assert!(!conn.check_alive());
        conn.mark_alive();
        assert!(conn.check_alive());
    }

    #[test]
    fn silent_duration_grows() {
        let (conn, _rx) = make_connection();
        std::thread::sleep(Duration::from_millis(5));
        assert!(conn.silent_for() >= Duration::from_millis(5));
        conn.mark_alive();
        assert!(conn.silent_for() < Duration::from_millis(5));
    }
}
