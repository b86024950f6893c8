//! The single task that owns the relay engine.
//!
//! Sessions never touch relay state. They push [`Inbound`] messages onto
//! one mpsc channel and this task applies them in arrival order, so every
//! event is applied to completion before the next one starts.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::{counter, gauge};
use tether_core::{ClientEvent, ConnectionId};
use tether_relay::{Outcome, RelayEngine, Transport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::{
    RELAY_DELIVERIES_TOTAL, RELAY_EVENTS_TOTAL, RELAY_RECORDS_ACTIVE, RELAY_ROOMS_ACTIVE,
};

/// Message from a session to the dispatcher.
#[derive(Debug)]
pub enum Inbound {
    /// A decoded client event.
    Event {
        /// Connection that sent it.
        from: ConnectionId,
        /// The event.
        event: ClientEvent,
    },
    /// The connection is gone.
    Disconnected {
        /// Connection that closed.
        id: ConnectionId,
    },
}

/// Relay sizes published for `/health`.
#[derive(Debug, Default)]
pub struct RelayStats {
    rooms: AtomicUsize,
    records: AtomicUsize,
}

impl RelayStats {
    /// Rooms holding at least one sender record.
    pub fn rooms(&self) -> usize {
        self.rooms.load(Ordering::Relaxed)
    }

    /// Sender records across all rooms.
    pub fn records(&self) -> usize {
        self.records.load(Ordering::Relaxed)
    }

    fn update(&self, rooms: usize, records: usize) {
        self.rooms.store(rooms, Ordering::Relaxed);
        self.records.store(records, Ordering::Relaxed);
    }
}

/// Owns the engine and drains the inbound channel.
pub struct Dispatcher<T> {
    engine: RelayEngine<T>,
    rx: mpsc::Receiver<Inbound>,
    stats: Arc<RelayStats>,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher delivering through `transport`.
    pub fn new(transport: T, rx: mpsc::Receiver<Inbound>, stats: Arc<RelayStats>) -> Self {
        Self {
            engine: RelayEngine::new(transport),
            rx,
            stats,
        }
    }

    /// Read access to the engine.
    pub fn engine(&self) -> &RelayEngine<T> {
        &self.engine
    }

    /// Apply one inbound message and record metrics.
    pub fn handle(&mut self, inbound: Inbound) -> Outcome {
        let (event, outcome) = match inbound {
            Inbound::Event { from, event } => {
                let name = event.name();
                (name, self.engine.apply(&from, event))
            }
            Inbound::Disconnected { id } => ("disconnect", self.engine.disconnect(&id)),
        };

        counter!(RELAY_EVENTS_TOTAL, "event" => event, "outcome" => outcome.label()).increment(1);
        counter!(RELAY_DELIVERIES_TOTAL).increment(outcome.delivered() as u64);

        let directory = self.engine.directory();
        let (rooms, records) = (directory.room_count(), directory.record_count());
        self.stats.update(rooms, records);
        gauge!(RELAY_ROOMS_ACTIVE).set(rooms as f64);
        gauge!(RELAY_RECORDS_ACTIVE).set(records as f64);

        debug!(event, outcome = outcome.label(), delivered = outcome.delivered(), "event applied");
        outcome
    }

    /// Drain the channel until cancelled or every sender is gone.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("dispatcher started");
        loop {
            tokio::select! {
                msg = self.rx.recv() => {
                    let Some(inbound) = msg else { break };
                    let _ = self.handle(inbound);
                }
                () = cancel.cancelled() => break,
            }
        }
        info!(
            rooms = self.stats.rooms(),
            records = self.stats.records(),
            "dispatcher stopped"
        );
    }
}
