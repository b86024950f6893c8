//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding or encoding a WebSocket frame.
///
/// None of these ever reach a client: the gateway logs them and drops the
/// frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame had no content.
    #[error("empty frame")]
    Empty,
    /// The frame was not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// The frame was JSON but had no string `event` field.
    #[error("frame has no event name")]
    MissingEvent,
    /// The `event` field named an event the server does not handle.
    #[error("unknown event: {0}")]
    UnknownEvent(String),
    /// The event is known but its `data` payload did not match.
    #[error("malformed {event} payload: {source}")]
    Malformed {
        /// Event name from the frame.
        event: String,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// An outbound event could not be serialized.
    #[error("failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ProtocolError {
    /// Short machine-readable label, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::InvalidJson(_) => "invalid_json",
            Self::MissingEvent => "missing_event",
            Self::UnknownEvent(_) => "unknown_event",
            Self::Malformed { .. } => "malformed",
            Self::Encode(_) => "encode",
        }
    }
}
