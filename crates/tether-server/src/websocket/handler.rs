//! Inbound frame decoding.
//!
//! Text frames, and binary frames holding UTF-8, carry client events.
//! Anything that fails to decode is logged and dropped; the client never
//! gets an error reply.

use axum::extract::ws::Message;
use metrics::counter;
use tether_core::{ClientEvent, ProtocolError};
use tracing::warn;

use crate::metrics::WS_FRAMES_REJECTED_TOTAL;

/// What the session should do with one inbound frame.
#[derive(Debug)]
pub enum FrameAction {
    /// Forward a decoded event to the dispatcher.
    Event(ClientEvent),
    /// The client closed the connection.
    Close,
    /// Ping or pong; nothing to forward.
    Control,
    /// Undecodable frame, already logged.
    Skip,
}

/// Classify and decode one inbound frame.
pub fn decode_frame(message: &Message) -> FrameAction {
    let text = match message {
        Message::Text(text) => text.as_str(),
        Message::Binary(data) => {
            if let Ok(text) = std::str::from_utf8(data) {
                text
            } else {
                counter!(WS_FRAMES_REJECTED_TOTAL, "kind" => "non_utf8").increment(1);
                warn!(len = data.len(), "dropping non-UTF8 binary frame");
                return FrameAction::Skip;
            }
        }
        Message::Close(_) => return FrameAction::Close,
        Message::Ping(_) | Message::Pong(_) => return FrameAction::Control,
    };

    match ClientEvent::decode(text) {
        Ok(event) => FrameAction::Event(event),
        Err(e) => reject(&e),
    }
}

fn reject(error: &ProtocolError) -> FrameAction {
    counter!(WS_FRAMES_REJECTED_TOTAL, "kind" => error.kind()).increment(1);
    warn!(kind = error.kind(), error = %error, "dropping inbound frame");
    FrameAction::Skip
}
