//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::ServerError;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, ServerError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format, or an empty body without a recorder.
pub fn render(handle: Option<&PrometheusHandle>) -> String {
    handle.map(PrometheusHandle::render).unwrap_or_default()
}

/// Connections accepted (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Connections removed (counter, labels: reason).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Live connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connection lifetime in seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Inbound frames handed to the validator (counter).
pub const WS_MESSAGES_RECEIVED_TOTAL: &str = "ws_messages_received_total";
/// Inbound frames rejected by the validator (counter, labels: kind).
pub const WS_VALIDATION_ERRORS_TOTAL: &str = "ws_validation_errors_total";
/// Broadcast calls (counter, labels: scope).
pub const WS_BROADCASTS_TOTAL: &str = "ws_broadcasts_total";
/// Frames enqueued to recipients by broadcasts (counter).
pub const WS_BROADCAST_DELIVERIES_TOTAL: &str = "ws_broadcast_deliveries_total";
/// Recipients skipped by broadcasts (counter, labels: cause).
pub const WS_BROADCAST_DROPS_TOTAL: &str = "ws_broadcast_drops_total";
/// Connections evicted for missing heartbeats (counter).
pub const WS_HEARTBEAT_EVICTIONS_TOTAL: &str = "ws_heartbeat_evictions_total";
