//! WebSocket connection state, registry, heartbeat, frame decoding and sessions.

pub mod connection;
pub mod handler;
pub mod heartbeat;
pub mod registry;
pub mod session;
