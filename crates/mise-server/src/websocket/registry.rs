//! Registry of open client connections.
//!
//! Fan-out of accepted event batches happens per subscription task (each
//! `syncEvents` request forwards from its own hub receiver), so the
//! registry's job is bookkeeping: health reporting and finding connections
//! during shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::connection::ClientConnection;

/// Tracks connected clients by connection ID.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self
            .connections
            .write()
            .insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub fn remove(&self, connection_id: &str) {
        let _ = self.connections.write().remove(connection_id);
    }

    /// Number of open connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }

    /// Snapshot of all open connections.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().values().cloned().collect()
    }
}
