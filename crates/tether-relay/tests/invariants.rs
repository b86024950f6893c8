//! Property tests: the engine's directory tracks a simple model of grants
//! under arbitrary event sequences, and disconnect leaves no trace.

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use tether_core::protocol::{ChatMessage, LocationShare, RoomRef, SenderRef};
use tether_core::{ClientEvent, ConnectionId, Location, RoomId, ServerEvent};
use tether_relay::{MemoryTransport, RelayEngine};

const HANDLES: [&str; 4] = ["h0", "h1", "h2", "h3"];
const ROOMS: [&str; 2] = ["r0", "r1"];

#[derive(Clone, Debug)]
enum Op {
    Name(usize),
    Join(usize, usize),
    Request(usize, usize),
    Accept { receiver: usize, sender: usize, room: usize },
    Reject { receiver: usize, sender: usize, room: usize },
    Teardown(usize, usize),
    Share(usize, usize),
    Message(usize, usize),
    Disconnect(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let h = 0..HANDLES.len();
    let r = 0..ROOMS.len();
    prop_oneof![
        h.clone().prop_map(Op::Name),
        (h.clone(), r.clone()).prop_map(|(h, r)| Op::Join(h, r)),
        (h.clone(), r.clone()).prop_map(|(h, r)| Op::Request(h, r)),
        (h.clone(), h.clone(), r.clone()).prop_map(|(receiver, sender, room)| Op::Accept {
            receiver,
            sender,
            room
        }),
        (h.clone(), h.clone(), r.clone()).prop_map(|(receiver, sender, room)| Op::Reject {
            receiver,
            sender,
            room
        }),
        (h.clone(), r.clone()).prop_map(|(h, r)| Op::Teardown(h, r)),
        (h.clone(), r.clone()).prop_map(|(h, r)| Op::Share(h, r)),
        (h.clone(), r.clone()).prop_map(|(h, r)| Op::Message(h, r)),
        h.prop_map(Op::Disconnect),
    ]
}

fn conn(i: usize) -> ConnectionId {
    ConnectionId::from(HANDLES[i])
}

fn room(i: usize) -> RoomId {
    RoomId::from(ROOMS[i])
}

/// (room, sender) to authorized receivers.
type Model = BTreeMap<(RoomId, ConnectionId), BTreeSet<ConnectionId>>;

fn apply(engine: &mut RelayEngine<MemoryTransport>, model: &mut Model, op: &Op) {
    match *op {
        Op::Name(h) => {
            let _ = engine.apply(&conn(h), ClientEvent::SetName(format!("user{h}")));
        }
        Op::Join(h, r) => {
            let _ = engine.apply(&conn(h), ClientEvent::JoinRoom(room(r)));
        }
        Op::Request(h, r) => {
            let _ = engine.apply(
                &conn(h),
                ClientEvent::RequestConnection(RoomRef { room: room(r) }),
            );
            let _ = model.entry((room(r), conn(h))).or_default();
        }
        Op::Accept { receiver, sender, room: r } => {
            let _ = engine.apply(
                &conn(receiver),
                ClientEvent::AcceptConnection(SenderRef { room: room(r), sender_id: conn(sender) }),
            );
            if let Some(set) = model.get_mut(&(room(r), conn(sender))) {
                let _ = set.insert(conn(receiver));
            }
        }
        Op::Reject { receiver, sender, room: r } => {
            let _ = engine.apply(
                &conn(receiver),
                ClientEvent::RejectConnection(SenderRef { room: room(r), sender_id: conn(sender) }),
            );
            if let Some(set) = model.get_mut(&(room(r), conn(sender))) {
                let _ = set.remove(&conn(receiver));
            }
        }
        Op::Teardown(h, r) => {
            let _ = engine.apply(
                &conn(h),
                ClientEvent::DisconnectFromReceivers(RoomRef { room: room(r) }),
            );
            let _ = model.remove(&(room(r), conn(h)));
        }
        Op::Share(h, r) => {
            let _ = engine.apply(
                &conn(h),
                ClientEvent::ShareLocation(LocationShare {
                    room: room(r),
                    location: Location { latitude: 1.0, longitude: 2.0, timestamp: 3 },
                }),
            );
        }
        Op::Message(h, r) => {
            let _ = engine.apply(
                &conn(h),
                ClientEvent::SendMessage(ChatMessage {
                    room: room(r),
                    message: "m".into(),
                    timestamp: Some(1.into()),
                }),
            );
        }
        Op::Disconnect(h) => {
            let _ = engine.disconnect(&conn(h));
            model.retain(|(_, sender), _| *sender != conn(h));
            for set in model.values_mut() {
                let _ = set.remove(&conn(h));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn directory_matches_model(ops in proptest::collection::vec(op(), 0..60)) {
        let mut engine = RelayEngine::new(MemoryTransport::new());
        let mut model = Model::new();

        for op in &ops {
            apply(&mut engine, &mut model, op);

            let dir = engine.directory();
            prop_assert_eq!(dir.record_count(), model.len());
            prop_assert!(!dir.has_empty_rooms());
            for ((r, sender), expected) in &model {
                let record = dir.get(r, sender);
                prop_assert!(record.is_some(), "missing record for {} in {}", sender, r);
                prop_assert_eq!(record.map(|rec| rec.authorized().clone()), Some(expected.clone()));
            }
            let model_rooms: BTreeSet<&RoomId> = model.keys().map(|(r, _)| r).collect();
            prop_assert_eq!(dir.room_count(), model_rooms.len());
        }
    }

    #[test]
    fn disconnect_leaves_no_trace(
        ops in proptest::collection::vec(op(), 0..60),
        victim in 0..HANDLES.len(),
    ) {
        let mut engine = RelayEngine::new(MemoryTransport::new());
        let mut model = Model::new();
        for op in &ops {
            apply(&mut engine, &mut model, op);
        }

        let _ = engine.disconnect(&conn(victim));

        prop_assert!(!engine.directory().references(&conn(victim)));
        prop_assert!(!engine.directory().has_empty_rooms());
        prop_assert!(!engine.identities().contains(&conn(victim)));
        for r in 0..ROOMS.len() {
            prop_assert!(!engine.membership().is_member(&room(r), &conn(victim)));
        }
    }

    #[test]
    fn location_reaches_exactly_the_authorized_set(
        ops in proptest::collection::vec(op(), 0..60),
        sharer in 0..HANDLES.len(),
        r in 0..ROOMS.len(),
    ) {
        let mut engine = RelayEngine::new(MemoryTransport::new());
        let mut model = Model::new();
        for op in &ops {
            apply(&mut engine, &mut model, op);
        }
        let _ = engine.transport().take();

        apply(&mut engine, &mut model, &Op::Share(sharer, r));

        let got: BTreeSet<ConnectionId> = engine
            .transport()
            .take()
            .into_iter()
            .filter(|d| matches!(d.event, ServerEvent::ReceiveLocation(_)))
            .map(|d| d.to)
            .collect();
        let mut expected = model
            .get(&(room(r), conn(sharer)))
            .cloned()
            .unwrap_or_default();
        let _ = expected.remove(&conn(sharer));
        prop_assert_eq!(got, expected);
    }
}
