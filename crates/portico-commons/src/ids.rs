//! Type-safe identifier wrappers for gateway session objects.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-assigned statement identifier, monotonically increasing per
/// connection. Never reused for distinct resources within a server's
/// lifetime.
pub type StatementId = i32;

/// Client-chosen opaque connection identifier (drivers mint UUIDs).
///
/// A wrapper type so connection ids cannot be accidentally swapped with
/// other strings flowing through the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Cache key for a server-side statement: the owning connection plus the
/// server-assigned statement id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatementKey {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
}

impl StatementKey {
    pub fn new(connection_id: ConnectionId, statement_id: StatementId) -> Self {
        Self {
            connection_id,
            statement_id,
        }
    }
}

impl fmt::Display for StatementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.connection_id, self.statement_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_serializes_as_plain_string() {
        let id = ConnectionId::new("c-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"c-123\"");
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn statement_key_display() {
        let key = StatementKey::new(ConnectionId::new("c1"), 7);
        assert_eq!(key.to_string(), "c1:7");
    }
}
