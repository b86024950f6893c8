//! Delivery seam between the engine and live connections.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::{ConnectionId, ServerEvent};

/// Hands server events to individual connections.
///
/// Delivery is fire-and-forget: implementations must not block, retry or
/// buffer beyond the connection's own queue. A `false` return means the
/// event was dropped (unknown handle, full or closed queue).
pub trait Transport: Send + Sync {
    /// Deliver one event to one connection.
    fn deliver(&self, to: &ConnectionId, event: &ServerEvent) -> bool;

    /// Deliver the same event to several connections, in order.
    ///
    /// Returns how many deliveries succeeded. Implementations may override
    /// this to encode the event once.
    fn deliver_many(&self, to: &[ConnectionId], event: &ServerEvent) -> usize {
        to.iter().filter(|id| self.deliver(id, event)).count()
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn deliver(&self, to: &ConnectionId, event: &ServerEvent) -> bool {
        (**self).deliver(to, event)
    }

    fn deliver_many(&self, to: &[ConnectionId], event: &ServerEvent) -> usize {
        (**self).deliver_many(to, event)
    }
}

/// One recorded delivery.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    /// Recipient handle.
    pub to: ConnectionId,
    /// The delivered event.
    pub event: ServerEvent,
}

/// In-memory transport that records every delivery.
///
/// Handles marked with [`MemoryTransport::close`] refuse deliveries, which
/// stands in for a full or closed connection queue.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    deliveries: Mutex<Vec<Delivery>>,
    closed: Mutex<HashSet<ConnectionId>>,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse all future deliveries to `id`.
    pub fn close(&self, id: &ConnectionId) {
        let _ = self.closed.lock().insert(id.clone());
    }

    /// Every delivery so far, in order.
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// Drain and return every delivery so far.
    pub fn take(&self) -> Vec<Delivery> {
        std::mem::take(&mut *self.deliveries.lock())
    }

    /// Events delivered to `id`, in order.
    pub fn events_for(&self, id: &ConnectionId) -> Vec<ServerEvent> {
        self.deliveries
            .lock()
            .iter()
            .filter(|d| &d.to == id)
            .map(|d| d.event.clone())
            .collect()
    }

    /// Number of deliveries so far.
    pub fn len(&self) -> usize {
        self.deliveries.lock().len()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.deliveries.lock().is_empty()
    }
}

impl Transport for MemoryTransport {
    fn deliver(&self, to: &ConnectionId, event: &ServerEvent) -> bool {
        if self.closed.lock().contains(to) {
            return false;
        }
        self.deliveries.lock().push(Delivery {
            to: to.clone(),
            event: event.clone(),
        });
        true
    }
}
