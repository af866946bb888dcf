//! Registry of live client connections.

use std::collections::BTreeMap;

use chrono::Utc;
use singalong_types::{Connection, ConnectionId};

/// Tracks live connections by identifier.
///
/// Identifiers come from a counter starting at 1 and are never reused, even
/// after the connection is removed.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: BTreeMap<ConnectionId, Connection>,
    next_id: ConnectionId,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            connections: BTreeMap::new(),
            next_id: ConnectionId::FIRST,
        }
    }

    /// Open a new connection and return it.
    pub fn add(&mut self) -> Connection {
        let connection = Connection {
            id: self.next_id,
            created_at: Utc::now(),
        };
        self.next_id = self.next_id.next();
        self.connections.insert(connection.id, connection.clone());
        connection
    }

    /// Look up a connection. Unknown identifiers yield `None`.
    pub fn get(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.get(&id).cloned()
    }

    /// Whether the identifier refers to a live connection.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Remove a connection, returning it if it was present.
    pub fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether there are no live connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut registry = ConnectionRegistry::new();
        assert_eq!(registry.add().id, ConnectionId(1));
        assert_eq!(registry.add().id, ConnectionId(2));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut registry = ConnectionRegistry::new();
        let first = registry.add();
        assert!(registry.remove(first.id).is_some());
        assert_eq!(registry.add().id, ConnectionId(2));
    }

    #[test]
    fn get_returns_stored_connection() {
        let mut registry = ConnectionRegistry::new();
        let added = registry.add();
        assert_eq!(registry.get(added.id).unwrap(), added);
        assert!(registry.get(ConnectionId(99)).is_none());
    }

    #[test]
    fn removing_unknown_is_a_no_op() {
        let mut registry = ConnectionRegistry::new();
        registry.add();
        assert!(registry.remove(ConnectionId(42)).is_none());
        assert_eq!(registry.len(), 1);
    }
}
