//! Server configuration.

use std::time::Duration;

use matchfeed_settings::MatchfeedSettings;

/// Runtime configuration for [`MatchfeedServer`](crate::server::MatchfeedServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Route for WebSocket upgrades.
    pub ws_path: String,
    /// Transport cap applied to both frame and message size.
    pub max_payload_bytes: usize,
    /// Upgrades beyond this many live connections get 503.
    pub max_connections: usize,
    /// Heartbeat probe period.
    pub heartbeat_interval: Duration,
    /// Outbound queue length per connection.
    pub send_queue_capacity: usize,
    /// Bound on waiting for the listener to drain at shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            ws_path: "/ws".into(),
            max_payload_bytes: 1024 * 1024,
            max_connections: 10_000,
            heartbeat_interval: Duration::from_secs(30),
            send_queue_capacity: 256,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&MatchfeedSettings> for ServerConfig {
    fn from(settings: &MatchfeedSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            ws_path: settings.server.ws_path.clone(),
            max_payload_bytes: settings.server.max_payload_bytes,
            max_connections: settings.server.max_connections,
            heartbeat_interval: Duration::from_millis(settings.hub.heartbeat_interval_ms),
            send_queue_capacity: settings.hub.send_queue_capacity,
            shutdown_timeout: Duration::from_millis(settings.server.shutdown_timeout_ms),
        }
    }
}

impl ServerConfig {
    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
