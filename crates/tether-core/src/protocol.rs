//! WebSocket wire protocol.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Event names are the same snake_case names the browser clients already
//! emit and listen for, so a client maps one-to-one onto these enums.
//!
//! Inbound frames are validated here, at the boundary; the relay engine
//! only ever sees a well-typed [`ClientEvent`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ProtocolError;
use crate::ids::{ConnectionId, RoomId};

/// A geolocation fix as reported by the browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Client clock, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Payload naming only a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRef {
    /// Target room.
    pub room: RoomId,
}

/// Payload naming a sender's record in a room (accept / reject).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderRef {
    /// Room of the sender's record.
    pub room: RoomId,
    /// The sender being accepted or rejected.
    pub sender_id: ConnectionId,
}

/// `share_location` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationShare {
    /// Room the sender is sharing in.
    pub room: RoomId,
    /// The fix to deliver.
    pub location: Location,
}

/// `send_message` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Room the message belongs to.
    pub room: RoomId,
    /// Message body, delivered verbatim.
    pub message: String,
    /// Client-supplied timestamp, relayed as-is (epoch millis, ISO string,
    /// anything). Filled in by the server when absent or null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

/// Events a client sends to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Set (or replace) this connection's display name.
    SetName(String),
    /// Subscribe to room-wide broadcasts.
    JoinRoom(RoomId),
    /// Announce this connection as a sender in a room.
    RequestConnection(RoomRef),
    /// Grant a sender the right to deliver to this connection.
    AcceptConnection(SenderRef),
    /// Refuse (or revoke) a sender's right to deliver to this connection.
    RejectConnection(SenderRef),
    /// Tear down this connection's sender record in a room.
    DisconnectFromReceivers(RoomRef),
    /// Broadcast a location fix to authorized receivers.
    ShareLocation(LocationShare),
    /// Tell authorized receivers that sharing stopped.
    StopLocationSharing(RoomRef),
    /// Group chat message.
    SendMessage(ChatMessage),
}

impl ClientEvent {
    /// Every event name accepted from clients.
    pub const NAMES: [&'static str; 9] = [
        "set_name",
        "join_room",
        "request_connection",
        "accept_connection",
        "reject_connection",
        "disconnect_from_receivers",
        "share_location",
        "stop_location_sharing",
        "send_message",
    ];

    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        if text.trim().is_empty() {
            return Err(ProtocolError::Empty);
        }
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
        let event = value
            .get("event")
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingEvent)?
            .to_owned();
        if !Self::NAMES.contains(&event.as_str()) {
            return Err(ProtocolError::UnknownEvent(event));
        }
        serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { event, source })
    }

    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetName(_) => "set_name",
            Self::JoinRoom(_) => "join_room",
            Self::RequestConnection(_) => "request_connection",
            Self::AcceptConnection(_) => "accept_connection",
            Self::RejectConnection(_) => "reject_connection",
            Self::DisconnectFromReceivers(_) => "disconnect_from_receivers",
            Self::ShareLocation(_) => "share_location",
            Self::StopLocationSharing(_) => "stop_location_sharing",
            Self::SendMessage(_) => "send_message",
        }
    }

    /// Room the event targets, if any.
    pub fn room(&self) -> Option<&RoomId> {
        match self {
            Self::SetName(_) => None,
            Self::JoinRoom(room) => Some(room),
            Self::RequestConnection(r)
            | Self::DisconnectFromReceivers(r)
            | Self::StopLocationSharing(r) => Some(&r.room),
            Self::AcceptConnection(s) | Self::RejectConnection(s) => Some(&s.room),
            Self::ShareLocation(s) => Some(&s.room),
            Self::SendMessage(m) => Some(&m.room),
        }
    }
}

/// Identifies a sender in outbound events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    /// Sender's connection handle.
    pub sender_id: ConnectionId,
    /// Sender's current display name.
    pub sender_name: String,
}

/// Identifies a receiver in outbound events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverInfo {
    /// Receiver's connection handle.
    pub receiver_id: ConnectionId,
    /// Receiver's current display name.
    pub receiver_name: String,
}

/// `receive_location` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// The fix, as sent by the sender.
    pub location: Location,
    /// Sender's connection handle.
    pub sender_id: ConnectionId,
    /// Sender's current display name.
    pub sender_name: String,
}

/// `receive_message` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDelivery {
    /// Author of the message (sender or receiver).
    pub sender_id: ConnectionId,
    /// Author's current display name.
    pub sender_name: String,
    /// Message body.
    pub message: String,
    /// The author's timestamp, or the server clock in epoch milliseconds.
    pub timestamp: Value,
}

/// `connection_established` payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Established {
    /// The handle other participants will see for this connection.
    pub connection_id: ConnectionId,
}

/// Events the server sends to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Greeting carrying the connection's own handle.
    ConnectionEstablished(Established),
    /// A sender in the room is asking for receivers.
    RequestConnection(SenderInfo),
    /// A receiver accepted this sender.
    AcceptConnection(ReceiverInfo),
    /// A receiver rejected this sender.
    RejectConnection(ReceiverInfo),
    /// The sender tore down its record or left.
    SenderDisconnected(SenderInfo),
    /// Location fix from an authorized sender.
    ReceiveLocation(LocationUpdate),
    /// The sender stopped sharing location.
    LocationSharingStopped(SenderInfo),
    /// Group chat message.
    ReceiveMessage(MessageDelivery),
}

impl ServerEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished(_) => "connection_established",
            Self::RequestConnection(_) => "request_connection",
            Self::AcceptConnection(_) => "accept_connection",
            Self::RejectConnection(_) => "reject_connection",
            Self::SenderDisconnected(_) => "sender_disconnected",
            Self::ReceiveLocation(_) => "receive_location",
            Self::LocationSharingStopped(_) => "location_sharing_stopped",
            Self::ReceiveMessage(_) => "receive_message",
        }
    }

    /// Serialize to a text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}
