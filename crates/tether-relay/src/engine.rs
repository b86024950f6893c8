//! The relay engine and its outcome type.
//!
//! [`RelayEngine::apply`] is the single entry point for client events and
//! [`RelayEngine::disconnect`] for terminations. Each call runs to
//! completion, delivering synchronously through the [`Transport`], so the
//! order a receiver observes is the order the engine applied events.

use tether_core::protocol::{
    ChatMessage, LocationShare, ReceiverInfo, RoomRef, SenderInfo, SenderRef,
};
use tether_core::{ClientEvent, ConnectionId};
use tracing::debug;

use crate::directory::RoomDirectory;
use crate::identity::IdentityRegistry;
use crate::membership::RoomMembership;
use crate::transport::Transport;

/// Why an event changed nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No record exists for the named (room, sender).
    NoRecord,
    /// The invoker is neither a sender nor an authorized receiver in the room.
    NotParticipant,
}

impl IgnoreReason {
    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoRecord => "no_record",
            Self::NotParticipant => "not_participant",
        }
    }
}

/// Result of applying one event.
///
/// Never sent to clients: ignored events are silent by contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// State was updated (or the event was a pure broadcast).
    Applied {
        /// Deliveries the transport accepted.
        delivered: usize,
    },
    /// Nothing happened.
    Ignored(IgnoreReason),
}

impl Outcome {
    pub(crate) fn applied(delivered: usize) -> Self {
        Self::Applied { delivered }
    }

    /// Deliveries made, zero when ignored.
    pub fn delivered(self) -> usize {
        match self {
            Self::Applied { delivered } => delivered,
            Self::Ignored(_) => 0,
        }
    }

    /// Whether the event was applied.
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::Ignored(reason) => reason.as_str(),
        }
    }
}

/// Owns every piece of relay state and the transport used to deliver.
#[derive(Debug)]
pub struct RelayEngine<T> {
    pub(crate) transport: T,
    pub(crate) identities: IdentityRegistry,
    pub(crate) membership: RoomMembership,
    pub(crate) directory: RoomDirectory,
}

impl<T: Transport> RelayEngine<T> {
    /// Create an engine with empty state.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            identities: IdentityRegistry::new(),
            membership: RoomMembership::new(),
            directory: RoomDirectory::new(),
        }
    }

    /// Apply one client event on behalf of `from`.
    pub fn apply(&mut self, from: &ConnectionId, event: ClientEvent) -> Outcome {
        match event {
            ClientEvent::SetName(name) => {
                debug!(conn_id = %from, name = %name, "name set");
                self.identities.set_name(from, name);
                Outcome::applied(0)
            }
            ClientEvent::JoinRoom(room) => {
                let joined = self.membership.join(&room, from);
                debug!(conn_id = %from, room = %room, joined, "room joined");
                Outcome::applied(0)
            }
            ClientEvent::RequestConnection(RoomRef { room }) => {
                self.request_connection(&room, from)
            }
            ClientEvent::AcceptConnection(SenderRef { room, sender_id }) => {
                self.accept_connection(&room, &sender_id, from)
            }
            ClientEvent::RejectConnection(SenderRef { room, sender_id }) => {
                self.reject_connection(&room, &sender_id, from)
            }
            ClientEvent::DisconnectFromReceivers(RoomRef { room }) => self.teardown(&room, from),
            ClientEvent::ShareLocation(LocationShare { room, location }) => {
                self.share_location(&room, from, location)
            }
            ClientEvent::StopLocationSharing(RoomRef { room }) => {
                self.stop_location_sharing(&room, from)
            }
            ClientEvent::SendMessage(ChatMessage {
                room,
                message,
                timestamp,
            }) => self.send_message(&room, from, message, timestamp),
        }
    }

    /// Display names.
    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    /// Room-wide subscriptions.
    pub fn membership(&self) -> &RoomMembership {
        &self.membership
    }

    /// Authorization records.
    pub fn directory(&self) -> &RoomDirectory {
        &self.directory
    }

    /// The delivery transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn sender_info(&self, sender: &ConnectionId) -> SenderInfo {
        SenderInfo {
            sender_id: sender.clone(),
            sender_name: self.identities.name_of(sender).to_owned(),
        }
    }

    pub(crate) fn receiver_info(&self, receiver: &ConnectionId) -> ReceiverInfo {
        ReceiverInfo {
            receiver_id: receiver.clone(),
            receiver_name: self.identities.name_of(receiver).to_owned(),
        }
    }
}
