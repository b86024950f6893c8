//! Location and chat delivery to authorized sets.
//!
//! Fan-outs never echo to the invoking connection.

use serde_json::Value;
use tether_core::protocol::{LocationUpdate, MessageDelivery};
use tether_core::{ConnectionId, Location, RoomId, ServerEvent};
use tracing::debug;

use crate::engine::{IgnoreReason, Outcome, RelayEngine};
use crate::transport::Transport;

impl<T: Transport> RelayEngine<T> {
    /// Deliver a location fix to every receiver `sender` has authorized.
    pub fn share_location(
        &mut self,
        room: &RoomId,
        sender: &ConnectionId,
        location: Location,
    ) -> Outcome {
        let Some(targets) = self.authorized_targets(room, sender) else {
            debug!(room = %room, sender = %sender, "location from sender without record");
            return Outcome::Ignored(IgnoreReason::NoRecord);
        };
        let info = self.sender_info(sender);
        let event = ServerEvent::ReceiveLocation(LocationUpdate {
            location,
            sender_id: info.sender_id,
            sender_name: info.sender_name,
        });
        let delivered = self.transport.deliver_many(&targets, &event);
        debug!(
            room = %room,
            sender = %sender,
            receivers = targets.len(),
            delivered,
            "location shared"
        );
        Outcome::applied(delivered)
    }

    /// Tell `sender`'s authorized receivers that sharing stopped. The set
    /// itself is unchanged.
    pub fn stop_location_sharing(&mut self, room: &RoomId, sender: &ConnectionId) -> Outcome {
        let Some(targets) = self.authorized_targets(room, sender) else {
            debug!(room = %room, sender = %sender, "stop from sender without record");
            return Outcome::Ignored(IgnoreReason::NoRecord);
        };
        let event = ServerEvent::LocationSharingStopped(self.sender_info(sender));
        let delivered = self.transport.deliver_many(&targets, &event);
        debug!(
            room = %room,
            sender = %sender,
            receivers = targets.len(),
            "location sharing stopped"
        );
        Outcome::applied(delivered)
    }

    /// Group chat.
    ///
    /// From a sender: to its authorized receivers. From an authorized
    /// receiver: to that record's sender and the other receivers. Anyone
    /// else is ignored. The client's timestamp is relayed untouched; a
    /// missing or null one is replaced with the server clock in epoch
    /// milliseconds.
    pub fn send_message(
        &mut self,
        room: &RoomId,
        from: &ConnectionId,
        message: String,
        timestamp: Option<Value>,
    ) -> Outcome {
        let (path, targets) = if let Some(targets) = self.authorized_targets(room, from) {
            ("sender", targets)
        } else if let Some((sender, record)) = self.directory.find_by_receiver(room, from) {
            let targets: Vec<ConnectionId> = std::iter::once(sender)
                .chain(record.authorized().iter())
                .filter(|id| *id != from)
                .cloned()
                .collect();
            ("receiver", targets)
        } else {
            debug!(room = %room, conn_id = %from, "message from non-participant");
            return Outcome::Ignored(IgnoreReason::NotParticipant);
        };

        let event = ServerEvent::ReceiveMessage(MessageDelivery {
            sender_id: from.clone(),
            sender_name: self.identities.name_of(from).to_owned(),
            message,
            timestamp: timestamp
                .filter(|ts| !ts.is_null())
                .unwrap_or_else(|| Value::from(chrono::Utc::now().timestamp_millis())),
        });
        let delivered = self.transport.deliver_many(&targets, &event);
        debug!(
            room = %room,
            conn_id = %from,
            path,
            recipients = targets.len(),
            delivered,
            "message relayed"
        );
        Outcome::applied(delivered)
    }

    fn authorized_targets(
        &self,
        room: &RoomId,
        sender: &ConnectionId,
    ) -> Option<Vec<ConnectionId>> {
        let record = self.directory.get(room, sender)?;
        Some(
            record
                .authorized()
                .iter()
                .filter(|id| *id != sender)
                .cloned()
                .collect(),
        )
    }
}
