//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every struct is `#[serde(default)]`, so
//! a partial file fills missing fields from [`Default`].

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000, "maxConnections": 500 },
///   "hub": { "heartbeatIntervalMs": 15000 },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchfeedSettings {
    /// Network listener and transport limits.
    pub server: ServerSettings,
    /// Broadcast hub tuning.
    pub hub: HubSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl MatchfeedSettings {
    /// Reject values that deserialize fine but cannot be served.
    pub fn validate(&self) -> Result<()> {
        if !self.server.ws_path.starts_with('/') {
            return Err(SettingsError::InvalidValue(format!(
                "server.wsPath must start with '/', got {:?}",
                self.server.ws_path
            )));
        }
        if matches!(self.server.ws_path.as_str(), "/health" | "/metrics") {
            return Err(SettingsError::InvalidValue(format!(
                "server.wsPath {:?} collides with a built-in route",
                self.server.ws_path
            )));
        }
        if self.server.max_payload_bytes == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxPayloadBytes must be positive".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxConnections must be positive".into(),
            ));
        }
        if self.hub.heartbeat_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.heartbeatIntervalMs must be positive".into(),
            ));
        }
        if self.hub.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "hub.sendQueueCapacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Listener settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Path of the WebSocket endpoint.
    pub ws_path: String,
    /// Transport-level cap on a single frame or message.
    pub max_payload_bytes: usize,
    /// Live connections beyond which upgrades are refused.
    pub max_connections: usize,
    /// Upper bound on the graceful drain at shutdown.
    pub shutdown_timeout_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            ws_path: "/ws".to_string(),
            max_payload_bytes: 1024 * 1024,
            max_connections: 10_000,
            shutdown_timeout_ms: 10_000,
        }
    }
}

/// Hub settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// Heartbeat probe period in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Outbound frames buffered per connection before sends are dropped.
    pub send_queue_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 30_000,
            send_queue_capacity: 256,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive. `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults() {
        let s = MatchfeedSettings::default();
        assert_eq!(s.server.host, "0.0.0.0");
        assert_eq!(s.server.port, 8000);
        assert_eq!(s.server.ws_path, "/ws");
        assert_eq!(s.server.max_payload_bytes, 1_048_576);
        assert_eq!(s.server.max_connections, 10_000);
        assert_eq!(s.server.shutdown_timeout_ms, 10_000);
        assert_eq!(s.hub.heartbeat_interval_ms, 30_000);
        assert_eq!(s.hub.send_queue_capacity, 256);
        assert_eq!(s.logging.level, "info");
        assert!(!s.logging.json);
    }

    #[test]
    fn defaults_are_valid() {
        MatchfeedSettings::default().validate().unwrap();
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(MatchfeedSettings::default()).unwrap();
        assert_eq!(value["server"]["wsPath"], "/ws");
        assert_eq!(value["hub"]["heartbeatIntervalMs"], 30_000);
        assert_eq!(value["server"]["maxPayloadBytes"], 1_048_576);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: MatchfeedSettings =
            serde_json::from_value(json!({"hub": {"sendQueueCapacity": 8}})).unwrap();
        assert_eq!(s.hub.send_queue_capacity, 8);
        assert_eq!(s.hub.heartbeat_interval_ms, 30_000);
        assert_eq!(s.server, ServerSettings::default());
    }

    #[test]
    fn ws_path_without_slash_is_invalid() {
        let mut s = MatchfeedSettings::default();
        s.server.ws_path = "ws".into();
        let err = s.validate().unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue(_)));

        s.server.ws_path = "/metrics".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_limits_are_invalid() {
        let mut s = MatchfeedSettings::default();
        s.hub.send_queue_capacity = 0;
        assert!(s.validate().is_err());

        let mut s = MatchfeedSettings::default();
        s.hub.heartbeat_interval_ms = 0;
        assert!(s.validate().is_err());

        let mut s = MatchfeedSettings::default();
        s.server.max_connections = 0;
        assert!(s.validate().is_err());
    }
}
