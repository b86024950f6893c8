//! # tether-relay
//!
//! The relay engine: tracks, per room and per sender, which receivers have
//! been granted delivery rights, and routes location updates and chat
//! messages only to that set.
//!
//! - [`IdentityRegistry`]: connection handle to display name
//! - [`RoomMembership`]: room-wide subscriptions used for connection requests
//! - [`RoomDirectory`]: per-room authorization records
//! - [`RelayEngine`]: applies [`ClientEvent`](tether_core::ClientEvent)s and
//!   disconnects, delivering [`ServerEvent`](tether_core::ServerEvent)s
//!   through a [`Transport`]
//!
//! The engine is a plain owned value with `&mut self` operations. Callers
//! serialize access (the server gives it to a single dispatcher task).

#![deny(unsafe_code)]

mod authorization;
pub mod directory;
pub mod engine;
mod fanout;
pub mod identity;
mod lifecycle;
pub mod membership;
pub mod transport;

pub use directory::{AuthorizationRecord, RoomDirectory};
pub use engine::{IgnoreReason, Outcome, RelayEngine};
pub use identity::{IdentityRegistry, UNKNOWN_NAME};
pub use membership::RoomMembership;
pub use transport::{Delivery, MemoryTransport, Transport};
