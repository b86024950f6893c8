//! # tether-core
//!
//! Foundation types shared by every tether crate:
//!
//! - **Branded IDs**: `ConnectionId`, `RoomId` as newtypes for type safety
//! - **Protocol**: `ClientEvent` / `ServerEvent` tagged enums for the WebSocket wire format
//! - **Errors**: `ProtocolError` for frames rejected at the boundary
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod protocol;

pub use errors::ProtocolError;
pub use ids::{ConnectionId, RoomId};
pub use protocol::{ClientEvent, Location, ServerEvent};
