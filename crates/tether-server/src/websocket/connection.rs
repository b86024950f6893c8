//! Per-connection state shared between the session, heartbeat and registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tether_core::ConnectionId;
use tokio::sync::mpsc;

/// A connected WebSocket client.
///
/// Outbound frames go through a bounded queue drained by the session's
/// writer task; `send` never blocks.
#[derive(Debug)]
pub struct ClientConnection {
    /// Connection handle, also the client's identity in the relay.
    pub id: ConnectionId,
    tx: mpsc::Sender<Arc<str>>,
    /// When this connection was established.
    pub connected_at: Instant,
    is_alive: AtomicBool,
    last_seen: Mutex<Instant>,
    dropped: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<str>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_seen: Mutex::new(now),
            dropped: AtomicU64::new(0),
        }
    }

    /// Queue a text frame.
    ///
    /// Returns `false` if the queue is full or closed, and increments the
    /// drop counter.
    pub fn send(&self, frame: Arc<str>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Record inbound activity (any frame, including pongs).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_seen.lock() = Instant::now();
    }

    /// Return whether the client was active since the last check, and reset.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Time since the last inbound frame (or connection establishment).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
