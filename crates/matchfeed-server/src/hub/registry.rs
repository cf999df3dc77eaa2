//! Connection registry: the owning table of live connections.

use std::collections::HashMap;
use std::sync::Arc;

use matchfeed_core::ConnectionId;

use crate::websocket::connection::ClientConnection;

/// Live connections indexed by id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Arc<ClientConnection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a connection under its id.
    pub fn insert(&mut self, connection: Arc<ClientConnection>) {
        let _ = self.connections.insert(connection.id.clone(), connection);
    }

    /// Look up a connection.
    pub fn get(&self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.get(id).cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Remove a connection. A second call for the same id returns `None`.
    pub fn remove(&mut self, id: &ConnectionId) -> Option<Arc<ClientConnection>> {
        self.connections.remove(id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot of every registered connection.
    pub fn all(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.values().cloned().collect()
    }

    /// Remove and return every connection.
    pub fn drain(&mut self) -> Vec<Arc<ClientConnection>> {
        self.connections.drain().map(|(_, conn)| conn).collect()
    }
}
