//! The authoritative set of open channel connections.
//!
//! All mutation goes through [`ConnectionRegistry::attach`],
//! [`ConnectionRegistry::try_attach`] and [`ConnectionRegistry::detach`]. Readers take a [`snapshot`] and iterate it
//! after the lock is released, so a slow send never blocks membership changes.
//!
//! [`snapshot`]: ConnectionRegistry::snapshot

use std::collections::HashMap;
use std::sync::Arc;

use herald_core::ConnectionId;
use metrics::gauge;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::connection::ClientConnection;
use crate::metrics::WS_CONNECTIONS_ACTIVE;

/// Lock-guarded map of attached connections.
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new connection fed by `tx` and return its fresh identifier.
    ///
    /// The connection is a broadcast target as soon as this returns.
    pub fn attach(&self, tx: mpsc::Sender<Arc<String>>) -> ConnectionId {
        let connection = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
        let count = {
            let mut conns = self.connections.lock();
            let _ = conns.insert(connection.id().clone(), connection.clone());
            conns.len()
        };
        Self::attached(&connection, count);
        connection.id().clone()
    }

    /// Register a new connection unless `limit` connections are already
    /// attached. The check and the insert happen under one lock, so
    /// concurrent callers can never push the count past `limit`.
    pub fn try_attach(
        &self,
        tx: mpsc::Sender<Arc<String>>,
        limit: usize,
    ) -> Option<Arc<ClientConnection>> {
        let connection = Arc::new(ClientConnection::new(ConnectionId::new(), tx));
        let count = {
            let mut conns = self.connections.lock();
            if conns.len() >= limit {
                return None;
            }
            let _ = conns.insert(connection.id().clone(), connection.clone());
            conns.len()
        };
        Self::attached(&connection, count);
        Some(connection)
    }

    fn attached(connection: &ClientConnection, count: usize) {
        gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        debug!(conn_id = %connection.id(), count, "connection attached");
    }

    /// Remove a connection.
    ///
    /// Returns `false` when `id` was already absent; that case is a no-op.
    pub fn detach(&self, id: &ConnectionId) -> bool {
        let removed = self.connections.lock().remove(id);
        match removed {
            Some(_) => {
                gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
                debug!(conn_id = %id, "connection detached");
                true
            }
            None => false,
        }
    }

    /// Point-in-time copy of the membership.
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.lock().values().cloned().collect()
    }

    /// Whether `id` is currently attached.
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.lock().contains_key(id)
    }

    /// Record inbound activity for `id`. Returns `false` if not attached.
    pub fn touch(&self, id: &ConnectionId) -> bool {
        let conn = self.connections.lock().get(id).cloned();
        match conn {
            Some(c) => {
                c.mark_alive();
                true
            }
            None => false,
        }
    }

    /// Heartbeat probe: `None` if detached, otherwise whether the connection
    /// showed activity since the previous probe (the flag is reset).
    pub fn check_alive(&self, id: &ConnectionId) -> Option<bool> {
        let conn = self.connections.lock().get(id).cloned();
        conn.map(|c| c.check_alive())
    }

    /// Number of attached connections.
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Whether no connection is attached.
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Detaches its connection from the registry when dropped.
///
/// Held by the endpoint session so every exit path, including task abort on
/// shutdown, detaches exactly once.
pub struct Attachment {
    registry: Arc<ConnectionRegistry>,
    connection: Arc<ClientConnection>,
}

impl Attachment {
    /// Attach a new connection and guard it, or `None` when the registry
    /// already holds `limit` connections.
    pub fn try_attach(
        registry: Arc<ConnectionRegistry>,
        tx: mpsc::Sender<Arc<String>>,
        limit: usize,
    ) -> Option<Self> {
        let connection = registry.try_attach(tx, limit)?;
        Some(Self {
            registry,
            connection,
        })
    }

    /// Identifier of the guarded connection.
    pub fn id(&self) -> &ConnectionId {
        self.connection.id()
    }

    /// The guarded connection. Still readable after it was detached.
    pub fn connection(&self) -> &ClientConnection {
        &self.connection
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        let _ = self.registry.detach(self.connection.id());
    }
}
