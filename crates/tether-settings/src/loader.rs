//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`TetherSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `TETHER_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tether_core::logging::LogFormat;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::TetherSettings;

/// Resolve the path to the settings file (`~/.tether/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".tether").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TetherSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<TetherSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

/// Load from `path`, resolving overrides through `lookup` instead of the
/// process environment.
pub fn load_with<F>(path: &Path, lookup: F) -> Result<TetherSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(TetherSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: TetherSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `TETHER_*` environment variable overrides.
pub fn apply_env_overrides(settings: &mut TetherSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides resolved through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value
/// stays in effect.
pub fn apply_overrides<F>(settings: &mut TetherSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    if let Some(v) = env.string("TETHER_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("TETHER_PORT", |s| parse_u16_range(s, 0, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("TETHER_MAX_CONNECTIONS", |s| {
        parse_usize_range(s, 1, 1_000_000)
    }) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.string("TETHER_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("TETHER_LOG_FORMAT", |s| s.parse::<LogFormat>().ok()) {
        settings.logging.format = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env readers ─────────────────────────────────────────────────────────────

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = (self.lookup)(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 5001, "host": "0.0.0.0"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "0.0.0.0");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"allowedOrigins": ["a", "b"]});
        let source = serde_json::json!({"allowedOrigins": []});
        let merged = deep_merge(target, source);
        assert_eq!(merged["allowedOrigins"], serde_json::json!([]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 42);
    }

    // ── load_with ───────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let path = Path::new("/nonexistent/settings.json");
        let settings = load_with(path, no_env).unwrap();
        assert_eq!(settings.server.port, 5001);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "server": {"port": 9090, "allowedOrigins": ["https://app.example"]},
                "logging": {"format": "json"}
            }"#,
        )
        .unwrap();

        let settings = load_with(&path, no_env).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.allowed_origins, vec!["https://app.example"]);
        assert_eq!(settings.server.max_connections, 1000);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_with(&path, no_env);
        assert!(matches!(result.unwrap_err(), SettingsError::Json(_)));
    }

    #[test]
    fn load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"sendQueueCapacity": 0}}"#).unwrap();

        let result = load_with(&path, no_env);
        assert!(matches!(result.unwrap_err(), SettingsError::InvalidValue(_)));
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"port": 9090}}"#).unwrap();

        let settings = load_with(
            &path,
            env(&[
                ("TETHER_PORT", "7000"),
                ("TETHER_HOST", "127.0.0.1"),
                ("TETHER_MAX_CONNECTIONS", "50"),
                ("TETHER_LOG_LEVEL", "debug"),
                ("TETHER_LOG_FORMAT", "json"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.max_connections, 50);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = TetherSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("TETHER_PORT", "99999"),
                ("TETHER_MAX_CONNECTIONS", "0"),
                ("TETHER_LOG_FORMAT", "yaml"),
                ("TETHER_HOST", ""),
            ]),
        );
        assert_eq!(settings.server.port, 5001);
        assert_eq!(settings.server.max_connections, 1000);
        assert_eq!(settings.logging.format, LogFormat::Compact);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_u16_range_bounds() {
        assert_eq!(parse_u16_range("5001", 1, 65535), Some(5001));
        assert_eq!(parse_u16_range(" 80 ", 1, 65535), Some(80));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("abc", 1, 65535), None);
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
    }

    #[test]
    fn parse_usize_range_bounds() {
        assert_eq!(parse_usize_range("10", 1, 100), Some(10));
        assert_eq!(parse_usize_range("101", 1, 100), None);
        assert_eq!(parse_usize_range("-1", 1, 100), None);
    }

    #[test]
    fn settings_path_ends_with_tether_dir() {
        let path = settings_path();
        assert!(path.ends_with(".tether/settings.json"));
    }
}
