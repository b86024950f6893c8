//! # tether-settings
//!
//! Layered configuration for the tether relay server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`TetherSettings::default()`]
//! 2. **User file**: `~/.tether/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `TETHER_*` overrides (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, load_with, settings_path};
pub use types::{LoggingSettings, ServerSettings, TetherSettings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = TetherSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn deep_merge_re_exported() {
        let a = serde_json::json!({"x": 1});
        let b = serde_json::json!({"y": 2});
        let merged = deep_merge(a, b);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
