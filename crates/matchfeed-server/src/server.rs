//! `MatchfeedServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use matchfeed_core::protocol::OutboundFrame;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::health::{self, HealthResponse};
use crate::hub::{Hub, HubConfig};
use crate::metrics;
use crate::shutdown::{DrainOutcome, ShutdownCoordinator};
use crate::websocket::broadcast::BroadcastManager;
use crate::websocket::heartbeat::HeartbeatMonitor;
use crate::websocket::session::run_session;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection and subscription state.
    pub hub: Arc<Hub>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Admission limit for upgrades.
    pub max_connections: usize,
    /// Transport frame and message cap.
    pub max_payload_bytes: usize,
}

struct RunningTasks {
    heartbeat: JoinHandle<()>,
    server: JoinHandle<()>,
}

/// The matchfeed server.
pub struct MatchfeedServer {
    config: ServerConfig,
    hub: Arc<Hub>,
    broadcast: BroadcastManager,
    shutdown: Arc<ShutdownCoordinator>,
    tasks: Mutex<Option<RunningTasks>>,
    metrics: Option<PrometheusHandle>,
    start_time: Instant,
}

impl MatchfeedServer {
    /// Create a new server. Nothing is bound until [`listen`](Self::listen).
    pub fn new(config: ServerConfig) -> Self {
        let hub = Arc::new(Hub::new(HubConfig {
            send_queue_capacity: config.send_queue_capacity,
        }));
        Self {
            broadcast: BroadcastManager::new(Arc::clone(&hub)),
            hub,
            config,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            tasks: Mutex::new(None),
            metrics: None,
            start_time: Instant::now(),
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            hub: Arc::clone(&self.hub),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            max_connections: self.config.max_connections,
            max_payload_bytes: self.config.max_payload_bytes,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route(&self.config.ws_path, get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the listener, start the heartbeat monitor, and serve in the
    /// background. Returns the bound address.
    pub async fn listen(&self) -> Result<SocketAddr, ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let heartbeat = HeartbeatMonitor::new(Arc::clone(&self.hub), self.config.heartbeat_interval)
            .spawn(self.shutdown.heartbeat_token());

        let router = self.router();
        let stop = self.shutdown.accept_token();
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server terminated with error");
            }
        });

        *self.tasks.lock() = Some(RunningTasks { heartbeat, server });
        info!(
            addr = %local_addr,
            ws_path = %self.config.ws_path,
            heartbeat_ms = u64::try_from(self.config.heartbeat_interval.as_millis()).unwrap_or(u64::MAX),
            "matchfeed server listening"
        );
        Ok(local_addr)
    }

    /// Graceful shutdown.
    ///
    /// Notifies every client with `server_shutdown`, stops the heartbeat
    /// monitor, stops accepting, closes every connection (queued frames are
    /// flushed first), then waits for the listener up to the configured
    /// timeout.
    pub async fn shutdown(&self) {
        match self.broadcast.broadcast_to_all(&OutboundFrame::server_shutdown()) {
            Ok(report) => info!(delivered = report.delivered, "shutdown notice sent"),
            Err(e) => warn!(error = %e, "failed to send shutdown notice"),
        }

        self.shutdown.stop_heartbeat();
        let tasks = self.tasks.lock().take();
        let mut handles = Vec::new();
        if let Some(RunningTasks { heartbeat, server }) = tasks {
            if let Err(e) = heartbeat.await {
                warn!(error = %e, "heartbeat task failed");
            }
            handles.push(server);
        }

        self.shutdown.stop_accepting();
        self.hub.shutdown();
        if self.shutdown.drain(handles, self.config.shutdown_timeout).await == DrainOutcome::TimedOut {
            warn!("listener did not stop within the shutdown timeout");
        }
        info!("matchfeed server stopped");
    }

    /// Connection and subscription state.
    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Broadcast engine for producers.
    pub fn broadcast(&self) -> &BroadcastManager {
        &self.broadcast
    }

    /// Shutdown coordinator.
    pub fn shutdown_coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.hub))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> String {
    metrics::render(state.metrics.as_ref())
}

/// GET on the WebSocket path.
///
/// The connection limit is checked before the upgrade; concurrent upgrades
/// can overshoot it slightly.
async fn ws_handler(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if state.hub.is_shut_down() {
        return (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response();
    }
    let active = state.hub.connection_count();
    if active >= state.max_connections {
        warn!(active, limit = state.max_connections, "connection limit reached, rejecting upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let ws = match upgrade {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };
    let hub = Arc::clone(&state.hub);
    ws.max_message_size(state.max_payload_bytes)
        .max_frame_size(state.max_payload_bytes)
        .on_upgrade(move |socket| run_session(socket, hub))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use matchfeed_core::MatchId;
    use tower::ServiceExt;

    fn make_server() -> MatchfeedServer {
        MatchfeedServer::new(ServerConfig::default())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or_default())
    }

    #[test]
    fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().port, 0);
        assert_eq!(server.hub().connection_count(), 0);
        assert!(!server.shutdown_coordinator().is_shutting_down());
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let server = make_server();
        let (conn, _rx) = server.hub().register();
        let _ = server
            .hub()
            .subscribe(&conn.id, MatchId::new(1).unwrap())
            .unwrap();

        let (status, body) = get_json(server.router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 1);
        assert_eq!(body["topics"], 1);
        assert!(body["uptimeSecs"].is_number());
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_empty() {
        let server = make_server();
        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn ws_without_upgrade_headers_is_rejected() {
        let server = make_server();
        let (status, _) = get_json(server.router(), "/ws").await;
        assert!(status.is_client_error(), "{status}");
    }

    #[tokio::test]
    async fn ws_over_limit_is_503() {
        let server = MatchfeedServer::new(ServerConfig {
            max_connections: 1,
            ..ServerConfig::default()
        });
        let (_conn, _rx) = server.hub().register();
        let (status, _) = get_json(server.router(), "/ws").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn ws_after_shutdown_is_503() {
        let server = make_server();
        server.hub().shutdown();
        let (status, _) = get_json(server.router(), "/ws").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn custom_ws_path() {
        let server = MatchfeedServer::new(ServerConfig {
            ws_path: "/live".into(),
            max_connections: 0,
            ..ServerConfig::default()
        });
        let (status, _) = get_json(server.router(), "/live").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = get_json(server.router(), "/ws").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let server = make_server();
        let (status, _) = get_json(server.router(), "/nonexistent").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_and_shutdown() {
        let server = make_server();
        let addr = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        server.shutdown().await;
        assert!(server.shutdown_coordinator().is_shutting_down());
        assert!(server.hub().is_shut_down());
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let first = make_server();
        let addr = first.listen().await.unwrap();
        let second = MatchfeedServer::new(ServerConfig {
            port: addr.port(),
            ..ServerConfig::default()
        });
        let err = second.listen().await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        first.shutdown().await;
    }
}
