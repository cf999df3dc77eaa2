//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`MatchfeedSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `MATCHFEED_*` environment overrides
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::MatchfeedSettings;

/// Resolve the default settings file path (`~/.matchfeed/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".matchfeed").join("settings.json")
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid value is an
/// error.
pub fn load_settings_from_path(path: &Path) -> Result<MatchfeedSettings> {
    load_with(path, |name| std::env::var(name).ok())
}

fn load_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<MatchfeedSettings> {
    let defaults =
        serde_json::to_value(MatchfeedSettings::default()).map_err(|e| SettingsError::json(path, e))?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|e| SettingsError::json(path, e))?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: MatchfeedSettings =
        serde_json::from_value(merged).map_err(|e| SettingsError::json(path, e))?;
    apply_overrides(&mut settings, &env);
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
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `MATCHFEED_*` overrides read through `env`.
///
/// Integers must parse and fall within range; booleans accept
/// `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`. Invalid values are
/// logged and ignored.
fn apply_overrides(settings: &mut MatchfeedSettings, env: &dyn Fn(&str) -> Option<String>) {
    let vars = EnvReader(env);

    if let Some(v) = vars.string("MATCHFEED_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = vars.u16("MATCHFEED_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = vars.string("MATCHFEED_WS_PATH") {
        settings.server.ws_path = v;
    }
    if let Some(v) = vars.usize("MATCHFEED_MAX_CONNECTIONS", 1, 1_000_000) {
        settings.server.max_connections = v;
    }
    if let Some(v) = vars.u64("MATCHFEED_HEARTBEAT_INTERVAL", 1000, 600_000) {
        settings.hub.heartbeat_interval_ms = v;
    }
    if let Some(v) = vars.string("MATCHFEED_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = vars.bool("MATCHFEED_LOG_JSON") {
        settings.logging.json = v;
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

struct EnvReader<'a>(&'a dyn Fn(&str) -> Option<String>);

impl EnvReader<'_> {
    fn string(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, what: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = (self.0)(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid {what} env var, ignoring");
        }
        result
    }

    fn bool(&self, name: &str) -> Option<bool> {
        self.parsed(name, "boolean", parse_bool)
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        self.parsed(name, "u16", |v| parse_u16_range(v, min, max))
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        self.parsed(name, "u64", |v| parse_u64_range(v, min, max))
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        self.parsed(name, "usize", |v| parse_usize_range(v, min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn write_settings(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    // -- deep_merge --

    #[test]
    fn merge_nested_override() {
        let target = json!({"server": {"host": "0.0.0.0", "port": 8000}});
        let source = json!({"server": {"port": 9000}});
        assert_eq!(
            deep_merge(target, source),
            json!({"server": {"host": "0.0.0.0", "port": 9000}})
        );
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = json!({"a": 1});
        let source = json!({"a": null});
        assert_eq!(deep_merge(target, source), json!({"a": 1}));
    }

    #[test]
    fn merge_array_replaces() {
        let target = json!({"a": [1, 2, 3]});
        let source = json!({"a": [4]});
        assert_eq!(deep_merge(target, source), json!({"a": [4]}));
    }

    #[test]
    fn merge_new_keys_added() {
        let target = json!({"a": 1});
        let source = json!({"b": 2});
        assert_eq!(deep_merge(target, source), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = json!({"a": {"b": 1}});
        let source = json!({"a": 5});
        assert_eq!(deep_merge(target, source), json!({"a": 5}));
    }

    // -- file loading --

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_with(&dir.path().join("nope.json"), no_env).unwrap();
        assert_eq!(settings, MatchfeedSettings::default());
    }

    #[test]
    fn empty_object_returns_defaults() {
        let file = write_settings("{}");
        let settings = load_with(file.path(), no_env).unwrap();
        assert_eq!(settings, MatchfeedSettings::default());
    }

    #[test]
    fn partial_file_overrides() {
        let file = write_settings(r#"{"server": {"port": 9100}, "hub": {"heartbeatIntervalMs": 5000}}"#);
        let settings = load_with(file.path(), no_env).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.hub.heartbeat_interval_ms, 5000);
        assert_eq!(settings.hub.send_queue_capacity, 256);
    }

    #[test]
    fn invalid_json_is_error() {
        let file = write_settings("{not json");
        let err = load_with(file.path(), no_env).unwrap_err();
        assert!(matches!(err, SettingsError::Json { .. }));
    }

    #[test]
    fn wrong_field_type_is_error() {
        let file = write_settings(r#"{"server": {"port": "eight thousand"}}"#);
        let err = load_with(file.path(), no_env).unwrap_err();
        assert!(matches!(err, SettingsError::Json { ref path, .. } if path.as_path() == file.path()));
    }

    #[test]
    fn invalid_value_in_file_is_error() {
        let file = write_settings(r#"{"server": {"wsPath": "socket"}}"#);
        let err = load_with(file.path(), no_env).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));
    }

    // -- env overrides --

    #[test]
    fn env_overrides_file() {
        let file = write_settings(r#"{"server": {"port": 9100}}"#);
        let env = env_of(&[
            ("MATCHFEED_PORT", "9200"),
            ("MATCHFEED_HOST", "127.0.0.1"),
            ("MATCHFEED_HEARTBEAT_INTERVAL", "15000"),
            ("MATCHFEED_MAX_CONNECTIONS", "42"),
            ("MATCHFEED_WS_PATH", "/live"),
            ("MATCHFEED_LOG_LEVEL", "debug"),
            ("MATCHFEED_LOG_JSON", "yes"),
        ]);
        let settings = load_with(file.path(), env).unwrap();
        assert_eq!(settings.server.port, 9200);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.hub.heartbeat_interval_ms, 15_000);
        assert_eq!(settings.server.max_connections, 42);
        assert_eq!(settings.server.ws_path, "/live");
        assert_eq!(settings.logging.level, "debug");
        assert!(settings.logging.json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = MatchfeedSettings::default();
        let env = env_of(&[
            ("MATCHFEED_PORT", "0"),
            ("MATCHFEED_HEARTBEAT_INTERVAL", "10"),
            ("MATCHFEED_MAX_CONNECTIONS", "many"),
            ("MATCHFEED_LOG_JSON", "maybe"),
            ("MATCHFEED_HOST", ""),
        ]);
        apply_overrides(&mut settings, &env);
        assert_eq!(settings, MatchfeedSettings::default());
    }

    // -- parsers --

    #[test]
    fn parse_bool_variants() {
        for v in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "No", "off"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u64_range("999", 1000, 600_000), None);
        assert_eq!(parse_u64_range("600000", 1000, 600_000), Some(600_000));
        assert_eq!(parse_usize_range("-1", 1, 10), None);
    }

    #[test]
    fn settings_path_ends_with_matchfeed_dir() {
        let path = settings_path();
        assert!(path.ends_with(".matchfeed/settings.json"));
    }
}
