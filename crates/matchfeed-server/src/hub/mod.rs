//! The hub: shared connection and subscription state.
//!
//! [`Hub`] owns the [`ConnectionRegistry`] and the [`SubscriptionIndex`]
//! behind a single mutex. The lock is held only for map mutations and
//! snapshots, never across a send. Every termination path (client close,
//! transport error, heartbeat eviction, shutdown) goes through
//! [`Hub::disconnect`] or [`Hub::shutdown`], which purge both views under
//! the same lock acquisition.

pub mod registry;
pub mod subscriptions;

use std::sync::Arc;

use matchfeed_core::{ConnectionId, MatchId};
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub use registry::ConnectionRegistry;
pub use subscriptions::SubscriptionIndex;

use crate::metrics as names;
use crate::websocket::connection::{ClientConnection, Outbound};

/// Hub errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The connection is not (or no longer) registered.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

/// Why a connection left the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the transport failed.
    TransportError,
    /// Two consecutive heartbeat probes went unacknowledged.
    HeartbeatTimeout,
    /// The server is shutting down.
    ServerShutdown,
}

impl DisconnectReason {
    /// Metric and log label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::TransportError => "transport_error",
            Self::HeartbeatTimeout => "heartbeat_timeout",
            Self::ServerShutdown => "server_shutdown",
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hub tuning.
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Outbound queue length per connection.
    pub send_queue_capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_queue_capacity: 256,
        }
    }
}

#[derive(Debug, Default)]
struct HubState {
    registry: ConnectionRegistry,
    subscriptions: SubscriptionIndex,
}

/// Process-scoped hub state, shared by sessions, the broadcast engine and
/// the heartbeat monitor.
#[derive(Debug)]
pub struct Hub {
    state: Mutex<HubState>,
    root: CancellationToken,
    config: HubConfig,
}

impl Hub {
    /// Create an empty hub.
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            root: CancellationToken::new(),
            config,
        }
    }

    /// Register a new connection with a fresh id, alive, with no topics.
    ///
    /// Returns the connection and the receiving end of its outbound queue.
    /// After [`shutdown`](Self::shutdown), the connection is not stored and
    /// its token is already cancelled.
    pub fn register(&self) -> (Arc<ClientConnection>, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(self.config.send_queue_capacity.max(1));
        let conn = Arc::new(ClientConnection::new(
            ConnectionId::new(),
            tx,
            self.root.child_token(),
        ));

        let active = {
            let mut state = self.state.lock();
            // shutdown cancels the root before draining under this lock
            if self.root.is_cancelled() {
                None
            } else {
                state.registry.insert(Arc::clone(&conn));
                Some(state.registry.len())
            }
        };
        let Some(active) = active else {
            debug!(conn_id = %conn.id, "registration after shutdown, not stored");
            return (conn, rx);
        };

        info!(conn_id = %conn.id, active, "client connected");
        counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
        #[allow(clippy::cast_precision_loss)]
        gauge!(names::WS_CONNECTIONS_ACTIVE).set(active as f64);
        (conn, rx)
    }

    /// Look up a live connection.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.state.lock().registry.get(id)
    }

    /// Subscribe a registered connection to `match_id`.
    ///
    /// Returns `Ok(false)` if it was already subscribed.
    pub fn subscribe(&self, id: &ConnectionId, match_id: MatchId) -> Result<bool, HubError> {
        let added = {
            let mut state = self.state.lock();
            if !state.registry.contains(id) {
                return Err(HubError::UnknownConnection(id.clone()));
            }
            state.subscriptions.subscribe(id, match_id)
        };
        debug!(conn_id = %id, %match_id, added, "subscribed");
        Ok(added)
    }

    /// Unsubscribe a registered connection from `match_id`.
    ///
    /// Returns `Ok(false)` if it was not subscribed.
    pub fn unsubscribe(&self, id: &ConnectionId, match_id: MatchId) -> Result<bool, HubError> {
        let removed = {
            let mut state = self.state.lock();
            if !state.registry.contains(id) {
                return Err(HubError::UnknownConnection(id.clone()));
            }
            state.subscriptions.unsubscribe(id, match_id)
        };
        debug!(conn_id = %id, %match_id, removed, "unsubscribed");
        Ok(removed)
    }

    /// Remove a connection from every topic and from the registry, then
    /// signal its session to stop.
    ///
    /// Idempotent: only the first call for an id returns the connection;
    /// later calls return `None` and have no effect.
    pub fn disconnect(
        &self,
        id: &ConnectionId,
        reason: DisconnectReason,
    ) -> Option<Arc<ClientConnection>> {
        let (conn, topics, active) = {
            let mut state = self.state.lock();
            let topics = state.subscriptions.remove_connection(id);
            let conn = state.registry.remove(id)?;
            (conn, topics, state.registry.len())
        };

        let _ = conn.begin_close();
        conn.terminate();
        record_disconnect(&conn, reason);
        info!(
            conn_id = %conn.id,
            %reason,
            topics = topics.len(),
            active,
            dropped = conn.drop_count(),
            "client disconnected"
        );
        #[allow(clippy::cast_precision_loss)]
        gauge!(names::WS_CONNECTIONS_ACTIVE).set(active as f64);
        Some(conn)
    }

    /// Snapshot of the live connections subscribed to `match_id`.
    ///
    /// Taken under the lock, so it never includes a connection whose
    /// removal has completed.
    pub fn subscribers_of(&self, match_id: MatchId) -> Vec<Arc<ClientConnection>> {
        let state = self.state.lock();
        state
            .subscriptions
            .subscribers_of(match_id)
            .iter()
            .filter_map(|id| state.registry.get(id))
            .collect()
    }

    /// Snapshot of every registered connection.
    pub fn connections(&self) -> Vec<Arc<ClientConnection>> {
        self.state.lock().registry.all()
    }

    /// Topics a connection is subscribed to.
    pub fn topics_of(&self, id: &ConnectionId) -> Vec<MatchId> {
        self.state.lock().subscriptions.topics_of(id)
    }

    /// Whether any connection is subscribed to `match_id`.
    pub fn has_topic(&self, match_id: MatchId) -> bool {
        self.state.lock().subscriptions.has_topic(match_id)
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.state.lock().subscriptions.topic_count()
    }

    /// Whether [`shutdown`](Self::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancel every connection and empty both the registry and the index.
    pub fn shutdown(&self) {
        self.root.cancel();
        let drained = {
            let mut state = self.state.lock();
            state.subscriptions.clear();
            state.registry.drain()
        };
        for conn in &drained {
            let _ = conn.begin_close();
            conn.terminate();
            record_disconnect(conn, DisconnectReason::ServerShutdown);
        }
        gauge!(names::WS_CONNECTIONS_ACTIVE).set(0.0);
        info!(closed = drained.len(), "hub shut down");
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

fn record_disconnect(conn: &ClientConnection, reason: DisconnectReason) {
    counter!(names::WS_DISCONNECTIONS_TOTAL, "reason" => reason.as_str()).increment(1);
    let lifetime = chrono::Utc::now() - conn.connected_at;
    #[allow(clippy::cast_precision_loss)]
    histogram!(names::WS_CONNECTION_DURATION_SECONDS)
        .record(lifetime.num_milliseconds().max(0) as f64 / 1000.0);
}
