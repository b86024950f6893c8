//! Live connections, and the relay's delivery transport.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use tether_core::{ConnectionId, ServerEvent};
use tether_relay::Transport;
use tracing::warn;

use super::connection::ClientConnection;
use crate::metrics::WS_SEND_DROPS_TOTAL;

/// Registry of connected clients, keyed by handle.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, Arc<ClientConnection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self.connections.insert(connection.id.clone(), connection);
    }

    /// Remove a connection. Later deliveries to it fail.
    pub fn remove(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.remove(id).map(|(_, conn)| conn)
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of live connections.
    pub fn count(&self) -> usize {
        self.connections.len()
    }

    fn send_frame(&self, to: &ConnectionId, frame: &Arc<str>, event: &'static str) -> bool {
        let Some(conn) = self.get(to) else {
            return false;
        };
        if conn.send(Arc::clone(frame)) {
            return true;
        }
        counter!(WS_SEND_DROPS_TOTAL).increment(1);
        warn!(
            conn_id = %to,
            event,
            dropped = conn.drop_count(),
            "send queue full or closed, dropping frame"
        );
        false
    }
}

impl Transport for ConnectionRegistry {
    fn deliver(&self, to: &ConnectionId, event: &ServerEvent) -> bool {
        self.deliver_many(std::slice::from_ref(to), event) == 1
    }

    fn deliver_many(&self, to: &[ConnectionId], event: &ServerEvent) -> usize {
        if to.is_empty() {
            return 0;
        }
        let frame: Arc<str> = match event.encode() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(event = event.name(), error = %e, "failed to encode event");
                return 0;
            }
        };
        to.iter()
            .filter(|id| self.send_frame(id, &frame, event.name()))
            .count()
    }
}
