//! Room-wide subscriptions.
//!
//! Membership is independent of authorization: joining a room only makes a
//! connection visible to `request_connection` broadcasts there.

use std::collections::{BTreeSet, HashMap};

use tether_core::{ConnectionId, RoomId};

/// Which connections have joined which rooms.
#[derive(Debug, Default)]
pub struct RoomMembership {
    rooms: HashMap<RoomId, BTreeSet<ConnectionId>>,
    joined: HashMap<ConnectionId, BTreeSet<RoomId>>,
}

impl RoomMembership {
    /// Create an empty membership table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handle` to `room`. Returns `false` if already a member.
    pub fn join(&mut self, room: &RoomId, handle: &ConnectionId) -> bool {
        let inserted = self
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(handle.clone());
        if inserted {
            let _ = self
                .joined
                .entry(handle.clone())
                .or_default()
                .insert(room.clone());
        }
        inserted
    }

    /// Current members of `room`, in handle order.
    pub fn members(&self, room: &RoomId) -> impl Iterator<Item = &ConnectionId> {
        self.rooms.get(room).into_iter().flatten()
    }

    /// Whether `handle` has joined `room`.
    pub fn is_member(&self, room: &RoomId, handle: &ConnectionId) -> bool {
        self.rooms.get(room).is_some_and(|m| m.contains(handle))
    }

    /// Remove `handle` from every room. Returns how many rooms it left.
    pub fn leave_all(&mut self, handle: &ConnectionId) -> usize {
        let Some(rooms) = self.joined.remove(handle) else {
            return 0;
        };
        for room in &rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                let _ = members.remove(handle);
                if members.is_empty() {
                    let _ = self.rooms.remove(room);
                }
            }
        }
        rooms.len()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
