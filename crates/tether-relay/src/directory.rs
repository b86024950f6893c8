//! Per-room authorization records.
//!
//! A room is a lazily created aggregate of records keyed by sender handle,
//! kept in the order the records were opened. Rooms are pruned as soon as
//! their last record goes away, so `contains_room` doubles as "has any
//! active sender".

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use tether_core::{ConnectionId, RoomId};

/// One sender's grant set inside a room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRecord {
    sender_name: String,
    authorized: BTreeSet<ConnectionId>,
}

impl AuthorizationRecord {
    fn new(sender_name: String) -> Self {
        Self {
            sender_name,
            authorized: BTreeSet::new(),
        }
    }

    /// Sender's display name when the record was first opened.
    pub fn sender_name(&self) -> &str {
        &self.sender_name
    }

    /// Receivers allowed to get this sender's deliveries.
    pub fn authorized(&self) -> &BTreeSet<ConnectionId> {
        &self.authorized
    }

    /// Whether `receiver` is in the authorized set.
    pub fn is_authorized(&self, receiver: &ConnectionId) -> bool {
        self.authorized.contains(receiver)
    }

    /// Add `receiver`. Returns `false` if it was already present.
    pub fn authorize(&mut self, receiver: &ConnectionId) -> bool {
        self.authorized.insert(receiver.clone())
    }

    /// Remove `receiver`. Returns `false` if it was not present.
    pub fn revoke(&mut self, receiver: &ConnectionId) -> bool {
        self.authorized.remove(receiver)
    }
}

#[derive(Debug, Default)]
struct RoomRecords {
    records: IndexMap<ConnectionId, AuthorizationRecord>,
}

/// Room to per-sender authorization records.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<RoomId, RoomRecords>,
}

impl RoomDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a record for `sender` in `room` unless one exists.
    ///
    /// Returns `true` when a new record was created. An existing record keeps
    /// its grants and its original name snapshot.
    pub fn open(&mut self, room: &RoomId, sender: &ConnectionId, sender_name: &str) -> bool {
        let records = &mut self.rooms.entry(room.clone()).or_default().records;
        if records.contains_key(sender) {
            return false;
        }
        let record = AuthorizationRecord::new(sender_name.to_owned());
        let _ = records.insert(sender.clone(), record);
        true
    }

    /// The record for (`room`, `sender`).
    pub fn get(&self, room: &RoomId, sender: &ConnectionId) -> Option<&AuthorizationRecord> {
        self.rooms.get(room)?.records.get(sender)
    }

    /// Mutable record for (`room`, `sender`).
    pub fn get_mut(
        &mut self,
        room: &RoomId,
        sender: &ConnectionId,
    ) -> Option<&mut AuthorizationRecord> {
        self.rooms.get_mut(room)?.records.get_mut(sender)
    }

    /// Delete the record for (`room`, `sender`), pruning the room if it
    /// becomes empty.
    pub fn remove(
        &mut self,
        room: &RoomId,
        sender: &ConnectionId,
    ) -> Option<AuthorizationRecord> {
        let entry = self.rooms.get_mut(room)?;
        let removed = entry.records.shift_remove(sender);
        if entry.records.is_empty() {
            let _ = self.rooms.remove(room);
        }
        removed
    }

    /// Oldest record in `room` that authorizes `receiver`.
    pub fn find_by_receiver(
        &self,
        room: &RoomId,
        receiver: &ConnectionId,
    ) -> Option<(&ConnectionId, &AuthorizationRecord)> {
        self.rooms
            .get(room)?
            .records
            .iter()
            .find(|(_, record)| record.is_authorized(receiver))
    }

    /// Rooms in which `sender` owns a record, sorted.
    pub fn rooms_owned_by(&self, sender: &ConnectionId) -> Vec<RoomId> {
        let mut rooms: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, r)| r.records.contains_key(sender))
            .map(|(room, _)| room.clone())
            .collect();
        rooms.sort();
        rooms
    }

    /// Remove `receiver` from every authorized set. Returns how many sets
    /// it was removed from.
    ///
    /// Records are kept even when their set becomes empty.
    pub fn purge_receiver(&mut self, receiver: &ConnectionId) -> usize {
        self.rooms
            .values_mut()
            .flat_map(|r| r.records.values_mut())
            .map(|record| record.revoke(receiver))
            .filter(|removed| *removed)
            .count()
    }

    /// Whether `handle` appears anywhere, as record owner or receiver.
    pub fn references(&self, handle: &ConnectionId) -> bool {
        self.rooms.values().any(|r| {
            r.records
                .iter()
                .any(|(sender, record)| sender == handle || record.is_authorized(handle))
        })
    }

    /// Whether `room` has at least one record.
    pub fn contains_room(&self, room: &RoomId) -> bool {
        self.rooms.contains_key(room)
    }

    /// Senders with a record in `room`, oldest record first.
    pub fn senders(&self, room: &RoomId) -> impl Iterator<Item = &ConnectionId> {
        self.rooms.get(room).into_iter().flat_map(|r| r.records.keys())
    }

    /// Number of rooms with at least one record.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total records across all rooms.
    pub fn record_count(&self) -> usize {
        self.rooms.values().map(|r| r.records.len()).sum()
    }

    /// Whether any room exists without records.
    ///
    /// Always `false` while pruning holds.
    pub fn has_empty_rooms(&self) -> bool {
        self.rooms.values().any(|r| r.records.is_empty())
    }
}
