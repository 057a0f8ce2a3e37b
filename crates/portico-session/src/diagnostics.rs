//! Read-only observation of session store internals.
//!
//! Tests and operational probes verify internal state (per-connection
//! dirty bit, cache contents) through this explicit surface instead of
//! reaching into private fields.

use portico_commons::{ConnectionId, StatementKey};

use crate::store::SessionStore;

pub struct StoreDiagnostics<'a> {
    store: &'a SessionStore,
}

impl<'a> StoreDiagnostics<'a> {
    pub(crate) fn new(store: &'a SessionStore) -> Self {
        Self { store }
    }

    pub fn connection_count(&self) -> usize {
        self.store.connections.run_pending_tasks();
        self.store.connections.entry_count() as usize
    }

    pub fn statement_count(&self) -> usize {
        self.store.statements.run_pending_tasks();
        self.store.statements.entry_count() as usize
    }

    pub fn statement_count_for(&self, id: &ConnectionId) -> usize {
        self.store.statements.run_pending_tasks();
        self.store
            .statements
            .iter()
            .filter(|(_, stmt)| &stmt.key().connection_id == id)
            .count()
    }

    /// Presence check that does not refresh the entry's idle timer.
    pub fn contains_connection(&self, id: &ConnectionId) -> bool {
        self.store.connections.contains_key(id)
    }

    /// The connection's local dirty bit, `None` when the id is unknown.
    pub async fn is_dirty(&self, id: &ConnectionId) -> Option<bool> {
        let entry = self.store.connections.get(id)?;
        let state = entry.lock().await;
        Some(state.props.is_dirty())
    }

    /// Whether the statement currently retains a server-held cursor.
    pub fn has_cursor(&self, key: &StatementKey) -> Option<bool> {
        let entry = self.store.try_statement(key)?;
        Some(entry.has_cursor())
    }
}
