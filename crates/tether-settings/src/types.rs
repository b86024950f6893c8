//! Settings types.
//!
//! Every struct is `#[serde(default)]` so a partial file only overrides the
//! keys it names.

use serde::{Deserialize, Serialize};
use tether_core::logging::LogFormat;

use crate::errors::{Result, SettingsError};

/// Root settings object (`~/.tether/settings.json`).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TetherSettings {
    /// Network and connection settings.
    pub server: ServerSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
}

impl TetherSettings {
    /// Reject combinations the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.server;
        if s.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be positive".into(),
            ));
        }
        if s.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be positive".into(),
            ));
        }
        if s.heartbeat_interval_secs == 0 {
            return Err(SettingsError::InvalidValue(
                "server.heartbeatIntervalSecs must be positive".into(),
            ));
        }
        if s.heartbeat_timeout_secs < s.heartbeat_interval_secs {
            return Err(SettingsError::InvalidValue(format!(
                "server.heartbeatTimeoutSecs ({}) is shorter than heartbeatIntervalSecs ({})",
                s.heartbeat_timeout_secs, s.heartbeat_interval_secs
            )));
        }
        if s.max_message_size < 1024 {
            return Err(SettingsError::InvalidValue(
                "server.maxMessageSize must be at least 1024 bytes".into(),
            ));
        }
        Ok(())
    }
}

/// Server network and connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP / WebSocket port.
    pub port: u16,
    /// Upgrades beyond this many live connections are refused.
    pub max_connections: usize,
    /// Seconds between server pings.
    pub heartbeat_interval_secs: u64,
    /// A connection silent for this long is closed.
    pub heartbeat_timeout_secs: u64,
    /// Largest accepted WebSocket frame, in bytes.
    pub max_message_size: usize,
    /// Outbound frames buffered per connection before drops begin.
    pub send_queue_capacity: usize,
    /// CORS origins. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            max_connections: 1000,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 64 * 1024,
            send_queue_capacity: 256,
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}
