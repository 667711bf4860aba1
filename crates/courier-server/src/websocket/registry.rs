//! Live connection set and broadcast fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use courier_core::codec;
use metrics::counter;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use super::connection::ClientConnection;
use crate::errors::ServerError;
use crate::metrics::BROADCAST_DROPS_TOTAL;

/// Outcome of one [`ConnectionRegistry::broadcast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the message was enqueued for.
    pub delivered: usize,
    /// Connections whose queue refused it.
    pub failed: usize,
}

/// Connections currently live, indexed by connection ID.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self
            .connections
            .write()
            .insert(connection.id.clone(), connection);
    }

    /// Remove a connection. Returns `false` if it was already gone.
    pub fn remove(&self, connection_id: &str) -> bool {
        self.connections.write().remove(connection_id).is_some()
    }

    /// Look up one connection.
    pub fn get(&self, connection_id: &str) -> Option<Arc<ClientConnection>> {
        self.connections.read().get(connection_id).cloned()
    }

    /// Whether `connection_id` is live.
    pub fn contains(&self, connection_id: &str) -> bool {
        self.connections.read().contains_key(connection_id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.read().len()
    }

    /// Whether no connection is live.
    pub fn is_empty(&self) -> bool {
        self.connections.read().is_empty()
    }

    /// Consistent copy of the live set.
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Send `obj` verbatim to one connection.
    pub fn send_obj<T: Serialize + ?Sized>(
        &self,
        connection_id: &str,
        obj: &T,
    ) -> Result<(), ServerError> {
        let conn = self
            .get(connection_id)
            .ok_or_else(|| ServerError::UnknownConnection(connection_id.to_owned()))?;
        conn.send_obj(obj)
    }

    /// Send `obj` verbatim to every live connection.
    ///
    /// Encodes once; an unencodable `obj` is logged and reaches nobody. A
    /// failed delivery is logged and counted and does not affect the others.
    pub fn broadcast<T: Serialize + ?Sized>(&self, obj: &T) -> Result<BroadcastReport, ServerError> {
        let text = Arc::new(codec::encode(obj).inspect_err(|e| {
            warn!(error = %e, "dropping unencodable broadcast");
        })?);
        let recipients = self.snapshot();
        let mut report = BroadcastReport::default();

        for conn in &recipients {
            match conn.send(Arc::clone(&text)) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    counter!(BROADCAST_DROPS_TOTAL).increment(1);
                    warn!(conn_id = %conn.id, error = %e, "failed to broadcast to client");
                }
            }
        }
        debug!(
            recipients = recipients.len(),
            delivered = report.delivered,
            failed = report.failed,
            "broadcast to all"
        );
        Ok(report)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
