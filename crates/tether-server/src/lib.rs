//! # tether-server
//!
//! Axum HTTP + `WebSocket` gateway for the relay engine.
//!
//! - `WebSocket` gateway at `/ws`: greeting, heartbeat, frame decoding
//! - A single dispatcher task owns the [`RelayEngine`](tether_relay::RelayEngine);
//!   sessions forward decoded events to it over an mpsc channel
//! - [`ConnectionRegistry`](websocket::registry::ConnectionRegistry) delivers
//!   engine output to per-connection bounded queues
//! - `/health` and `/metrics` endpoints, CORS
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ServerError;
pub use server::TetherServer;
