//! `tracing` subscriber initialization.
//!
//! Every crate logs through `tracing` macros with structured fields
//! (`conn_id`, `room`, `sender`, `event`). The binary calls
//! [`init_subscriber`] once at startup.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Output format for the stderr subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output.
    #[default]
    Compact,
    /// Newline-delimited JSON, one object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over `level` when set. Subsequent calls are
/// no-ops.
pub fn init_subscriber(level: &str, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // try_init is a no-op if a global subscriber is already set
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_subscriber_does_not_panic() {
        init_subscriber("warn", LogFormat::Compact);
        init_subscriber("debug", LogFormat::Json);
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Compact ".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Compact));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn log_format_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&LogFormat::Json).unwrap(), "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(parsed, LogFormat::Compact);
    }
}
