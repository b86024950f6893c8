//! Request, accept, reject and teardown of sender records.

use tether_core::protocol::SenderInfo;
use tether_core::{ConnectionId, RoomId, ServerEvent};
use tracing::debug;

use crate::engine::{IgnoreReason, Outcome, RelayEngine};
use crate::transport::Transport;

impl<T: Transport> RelayEngine<T> {
    /// Open (or reuse) `sender`'s record in `room` and announce it to every
    /// other member of the room.
    pub fn request_connection(&mut self, room: &RoomId, sender: &ConnectionId) -> Outcome {
        let name = self.identities.name_of(sender).to_owned();
        let created = self.directory.open(room, sender, &name);

        let targets: Vec<ConnectionId> = self
            .membership
            .members(room)
            .filter(|member| *member != sender)
            .cloned()
            .collect();
        let event = ServerEvent::RequestConnection(SenderInfo {
            sender_id: sender.clone(),
            sender_name: name,
        });
        let delivered = self.transport.deliver_many(&targets, &event);

        debug!(
            room = %room,
            sender = %sender,
            created,
            recipients = targets.len(),
            delivered,
            "connection requested"
        );
        Outcome::applied(delivered)
    }

    /// Add `receiver` to `sender`'s authorized set and tell the sender,
    /// unless the sender accepted itself.
    pub fn accept_connection(
        &mut self,
        room: &RoomId,
        sender: &ConnectionId,
        receiver: &ConnectionId,
    ) -> Outcome {
        let Some(record) = self.directory.get_mut(room, sender) else {
            debug!(
                room = %room,
                sender = %sender,
                receiver = %receiver,
                "accept for missing record"
            );
            return Outcome::Ignored(IgnoreReason::NoRecord);
        };
        let added = record.authorize(receiver);

        let event = ServerEvent::AcceptConnection(self.receiver_info(receiver));
        let delivered = self.notify_sender(sender, receiver, &event);

        debug!(room = %room, sender = %sender, receiver = %receiver, added, "connection accepted");
        Outcome::applied(delivered)
    }

    /// Remove `receiver` from `sender`'s authorized set (if present) and
    /// tell the sender either way, unless the sender rejected itself.
    pub fn reject_connection(
        &mut self,
        room: &RoomId,
        sender: &ConnectionId,
        receiver: &ConnectionId,
    ) -> Outcome {
        let Some(record) = self.directory.get_mut(room, sender) else {
            debug!(
                room = %room,
                sender = %sender,
                receiver = %receiver,
                "reject for missing record"
            );
            return Outcome::Ignored(IgnoreReason::NoRecord);
        };
        let removed = record.revoke(receiver);

        let event = ServerEvent::RejectConnection(self.receiver_info(receiver));
        let delivered = self.notify_sender(sender, receiver, &event);

        debug!(
            room = %room,
            sender = %sender,
            receiver = %receiver,
            removed,
            "connection rejected"
        );
        Outcome::applied(delivered)
    }

    fn notify_sender(
        &self,
        sender: &ConnectionId,
        receiver: &ConnectionId,
        event: &ServerEvent,
    ) -> usize {
        if receiver == sender {
            return 0;
        }
        usize::from(self.transport.deliver(sender, event))
    }

    /// Notify `sender`'s receivers, then delete the record and prune the
    /// room if it is left empty.
    pub fn teardown(&mut self, room: &RoomId, sender: &ConnectionId) -> Outcome {
        let Some(record) = self.directory.remove(room, sender) else {
            debug!(room = %room, sender = %sender, "teardown for missing record");
            return Outcome::Ignored(IgnoreReason::NoRecord);
        };

        let targets: Vec<ConnectionId> = record
            .authorized()
            .iter()
            .filter(|receiver| *receiver != sender)
            .cloned()
            .collect();
        let event = ServerEvent::SenderDisconnected(self.sender_info(sender));
        let delivered = self.transport.deliver_many(&targets, &event);

        debug!(
            room = %room,
            sender = %sender,
            receivers = targets.len(),
            pruned = !self.directory.contains_room(room),
            "sender record torn down"
        );
        Outcome::applied(delivered)
    }
}
