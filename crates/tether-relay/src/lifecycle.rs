//! Connection termination.

use tether_core::ConnectionId;
use tracing::debug;

use crate::engine::{Outcome, RelayEngine};
use crate::transport::Transport;

impl<T: Transport> RelayEngine<T> {
    /// Purge every trace of `handle`.
    ///
    /// Records it owns are torn down with `sender_disconnected` sent to
    /// their receivers. Its grants in other records are revoked without
    /// telling those senders. Membership and name go last, so teardown
    /// notifications still carry the departing sender's name.
    pub fn disconnect(&mut self, handle: &ConnectionId) -> Outcome {
        let owned = self.directory.rooms_owned_by(handle);
        let delivered: usize = owned
            .iter()
            .map(|room| self.teardown(room, handle).delivered())
            .sum();
        let revoked = self.directory.purge_receiver(handle);
        let rooms_left = self.membership.leave_all(handle);
        let _ = self.identities.forget(handle);

        debug!(
            conn_id = %handle,
            records_torn_down = owned.len(),
            grants_revoked = revoked,
            rooms_left,
            delivered,
            "connection purged"
        );
        Outcome::applied(delivered)
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::Outcome;
    use crate::engine::testing::*;
    use assert_matches::assert_matches;
    use tether_core::protocol::{LocationShare, RoomRef};
    use tether_core::{ClientEvent, Location, ServerEvent};

    #[test]
    fn sender_disconnect_tears_down_every_room() {
        let mut e = engine();
        seat(&mut e, "1", &[("s", "Sam"), ("a", "Ann")]);
        seat(&mut e, "2", &[("b", "Bea")]);
        let _ = request(&mut e, "1", "s");
        let _ = request(&mut e, "2", "s");
        let _ = accept(&mut e, "1", "s", "a");
        let _ = accept(&mut e, "2", "s", "b");
        let _ = e.transport().take();

        let out = e.disconnect(&id("s"));
        assert_eq!(out, Outcome::Applied { delivered: 2 });
        for receiver in ["a", "b"] {
            assert_matches!(
                e.transport().events_for(&id(receiver)).as_slice(),
                [ServerEvent::SenderDisconnected(info)] if info.sender_name == "Sam"
            );
        }
        assert_eq!(e.directory().room_count(), 0);
        assert!(!e.identities().contains(&id("s")));
    }

    #[test]
    fn receiver_disconnect_is_silent_and_keeps_record() {
        let mut e = engine();
        seat(&mut e, "56", &[("s", "Sam"), ("a", "Ann")]);
        let _ = request(&mut e, "56", "s");
        let _ = accept(&mut e, "56", "s", "a");
        let _ = e.transport().take();

        let out = e.disconnect(&id("a"));
        assert_eq!(out, Outcome::Applied { delivered: 0 });
        assert!(e.transport().is_empty());
        let record = e.directory().get(&room("56"), &id("s")).unwrap();
        assert!(record.authorized().is_empty());
        assert!(!e.membership().is_member(&room("56"), &id("a")));
    }

    #[test]
    fn handle_both_sender_and_receiver_is_fully_purged() {
        let mut e = engine();
        seat(&mut e, "56", &[("s", "Sam"), ("a", "Ann"), ("b", "Bea")]);
        let _ = request(&mut e, "56", "s");
        let _ = request(&mut e, "56", "a");
        let _ = accept(&mut e, "56", "s", "a");
        let _ = accept(&mut e, "56", "a", "b");

        let _ = e.disconnect(&id("a"));
        assert!(!e.directory().references(&id("a")));
        assert!(e.directory().get(&room("56"), &id("s")).is_some());
        assert!(!e.directory().has_empty_rooms());
    }

    #[test]
    fn disconnect_of_unknown_handle_is_harmless() {
        let mut e = engine();
        let out = e.disconnect(&id("ghost"));
        assert_eq!(out, Outcome::Applied { delivered: 0 });
    }

    #[test]
    fn scenario_room_56() {
        let mut e = engine();
        seat(&mut e, "56", &[("s", "Sam"), ("a", "Ann"), ("b", "Bea")]);
        let room_56 = room("56");

        let _ = request(&mut e, "56", "s");
        let _ = accept(&mut e, "56", "s", "a");
        let _ = accept(&mut e, "56", "s", "b");
        let _ = e.transport().take();

        let location = Location {
            latitude: 10.0,
            longitude: 20.0,
            timestamp: 1000,
        };
        let _ = e.apply(
            &id("s"),
            ClientEvent::ShareLocation(LocationShare {
                room: room_56.clone(),
                location: location.clone(),
            }),
        );
        for receiver in ["a", "b"] {
            assert_matches!(
                e.transport().events_for(&id(receiver)).as_slice(),
                [ServerEvent::ReceiveLocation(update)]
                    if update.sender_name == "Sam" && update.location == location
            );
        }
        let _ = e.transport().take();

        let _ = e.disconnect(&id("b"));
        let record = e.directory().get(&room_56, &id("s")).unwrap();
        assert_eq!(record.authorized().iter().collect::<Vec<_>>(), vec![&id("a")]);

        let _ = e.apply(
            &id("s"),
            ClientEvent::DisconnectFromReceivers(RoomRef {
                room: room_56.clone(),
            }),
        );
        assert_matches!(
            e.transport().events_for(&id("a")).as_slice(),
            [ServerEvent::SenderDisconnected(info)] if info.sender_id == id("s")
        );
        assert!(e.directory().get(&room_56, &id("s")).is_none());
        assert!(!e.directory().contains_room(&room_56));
    }
}
