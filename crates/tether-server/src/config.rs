//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_settings::ServerSettings;

/// Configuration for the tether server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close a connection after this many seconds without any frame.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound frames buffered per connection.
    pub send_queue_capacity: usize,
    /// Capacity of the session-to-dispatcher channel.
    pub inbound_queue_capacity: usize,
    /// CORS origins. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1000,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            inbound_queue_capacity: 1024,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
            max_connections: settings.max_connections,
            heartbeat_interval_secs: settings.heartbeat_interval_secs,
            heartbeat_timeout_secs: settings.heartbeat_timeout_secs,
            max_message_size: settings.max_message_size,
            send_queue_capacity: settings.send_queue_capacity,
            allowed_origins: settings.allowed_origins.clone(),
            ..Self::default()
        }
    }

    /// `host:port` as passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Heartbeat timeout as a `Duration`.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_on_ephemeral_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
    }

    #[test]
    fn default_limits() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.max_connections, 1000);
        assert_eq!(cfg.max_message_size, 64 * 1024);
        assert_eq!(cfg.send_queue_capacity, 256);
        assert!(cfg.allowed_origins.is_empty());
    }

    #[test]
    fn heartbeat_durations() {
        let cfg = ServerConfig {
            heartbeat_interval_secs: 15,
            heartbeat_timeout_secs: 45,
            ..ServerConfig::default()
        };
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(15));
        assert_eq!(cfg.heartbeat_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn from_settings_copies_every_field() {
        let settings = ServerSettings {
            host: "10.0.0.1".into(),
            port: 5001,
            max_connections: 5,
            heartbeat_interval_secs: 10,
            heartbeat_timeout_secs: 30,
            max_message_size: 2048,
            send_queue_capacity: 8,
            allowed_origins: vec!["http://localhost:5173".into()],
        };
        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.bind_addr(), "10.0.0.1:5001");
        assert_eq!(cfg.max_connections, 5);
        assert_eq!(cfg.heartbeat_interval_secs, 10);
        assert_eq!(cfg.heartbeat_timeout_secs, 30);
        assert_eq!(cfg.max_message_size, 2048);
        assert_eq!(cfg.send_queue_capacity, 8);
        assert_eq!(cfg.allowed_origins, vec!["http://localhost:5173"]);
        assert_eq!(cfg.inbound_queue_capacity, 1024);
    }

    #[test]
    fn deserialize_from_json_string() {
        let json = serde_json::json!({
            "host": "10.0.0.1",
            "port": 3000,
            "max_connections": 5,
            "heartbeat_interval_secs": 10,
            "heartbeat_timeout_secs": 30,
            "max_message_size": 4096,
            "send_queue_capacity": 16,
            "inbound_queue_capacity": 64,
            "allowed_origins": []
        });
        let cfg: ServerConfig = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.host, "10.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.send_queue_capacity, 16);
    }
}
