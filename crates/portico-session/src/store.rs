//! The session store: moka-backed caches with LRU-plus-TTI eviction and a
//! reaper task that closes evicted engine resources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use portico_commons::{ConnectionId, MetaError, Result, StatementKey};
use portico_engine::EngineConnection;
use tokio::sync::mpsc;

use crate::connection::ConnectionEntry;
use crate::diagnostics::StoreDiagnostics;
use crate::statement::{StatementEntry, StatementState};

/// Capacity and expiry bounds for the two caches.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connection_capacity: u64,
    pub statement_capacity: u64,
    /// Entries idle longer than this are expired; accessing an entry
    /// refreshes it.
    pub idle_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connection_capacity: 100,
            statement_capacity: 1_000,
            idle_ttl: Duration::from_secs(600),
        }
    }
}

enum Evicted {
    Connection(Arc<ConnectionEntry>),
    /// A duplicate-open candidate that lost the insert race. It shares
    /// its id with the surviving entry, so only its own engine resource
    /// may be closed; the live connection's statements stay untouched.
    DuplicateConnection(Arc<ConnectionEntry>),
    Statement(Arc<StatementEntry>),
}

/// Owns every live connection and statement. Clients hold only opaque
/// identifiers; when eviction or explicit close triggers, the store
/// releases the engine resource before the id becomes invalid.
///
/// Construct inside a tokio runtime: eviction handling runs on a spawned
/// reaper task.
pub struct SessionStore {
    pub(crate) connections: Cache<ConnectionId, Arc<ConnectionEntry>>,
    pub(crate) statements: Cache<StatementKey, Arc<StatementEntry>>,
    statement_seq: AtomicI32,
    reaper_tx: mpsc::UnboundedSender<Evicted>,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        let (reaper_tx, mut reaper_rx) = mpsc::unbounded_channel::<Evicted>();

        let stmt_tx = reaper_tx.clone();
        let statements: Cache<StatementKey, Arc<StatementEntry>> = Cache::builder()
            .max_capacity(config.statement_capacity)
            .time_to_idle(config.idle_ttl)
            .eviction_listener(move |key: Arc<StatementKey>, entry, cause| {
                if cause.was_evicted() {
                    log::debug!("statement {} evicted ({:?})", key, cause);
                    let _ = stmt_tx.send(Evicted::Statement(entry));
                }
            })
            .build();

        let conn_tx = reaper_tx.clone();
        let connections: Cache<ConnectionId, Arc<ConnectionEntry>> = Cache::builder()
            .max_capacity(config.connection_capacity)
            .time_to_idle(config.idle_ttl)
            .eviction_listener(move |id: Arc<ConnectionId>, entry, cause| {
                if cause.was_evicted() {
                    log::debug!("connection {} evicted ({:?})", id, cause);
                    let _ = conn_tx.send(Evicted::Connection(entry));
                }
            })
            .build();

        let orphaned_statements = statements.clone();
        tokio::spawn(async move {
            while let Some(evicted) = reaper_rx.recv().await {
                match evicted {
                    Evicted::Connection(entry) => {
                        // Statements of an evicted connection are dead
                        // with it; drop them before closing the engine
                        // resource.
                        let keys: Vec<(Arc<StatementKey>, Arc<StatementEntry>)> =
                            orphaned_statements
                                .iter()
                                .filter(|(_, stmt)| &stmt.key().connection_id == entry.id())
                                .collect();
                        for (key, stmt) in keys {
                            close_statement_cursor(&stmt).await;
                            stmt.set_state(StatementState::Closed);
                            orphaned_statements.invalidate(key.as_ref());
                        }
                        let mut state = entry.lock().await;
                        if let Err(e) = state.conn.close().await {
                            log::warn!("failed to close evicted connection {}: {}", entry.id(), e);
                        }
                    }
                    Evicted::DuplicateConnection(entry) => {
                        let mut state = entry.lock().await;
                        if let Err(e) = state.conn.close().await {
                            log::warn!(
                                "failed to close duplicate connection {}: {}",
                                entry.id(),
                                e
                            );
                        }
                    }
                    Evicted::Statement(entry) => {
                        close_statement_cursor(&entry).await;
                        entry.set_state(StatementState::Closed);
                    }
                }
            }
        });

        Self {
            connections,
            statements,
            statement_seq: AtomicI32::new(1),
            reaper_tx,
        }
    }

    /// Registers a connection under a client-chosen id. Returns the entry
    /// plus whether it was freshly inserted; re-opening an id with the
    /// same info map is idempotent, a conflicting map fails. The losing
    /// engine connection of a race or duplicate is closed by the reaper.
    pub fn register_connection(
        &self,
        id: &ConnectionId,
        info: HashMap<String, String>,
        conn: Box<dyn EngineConnection>,
    ) -> Result<(Arc<ConnectionEntry>, bool)> {
        let candidate = Arc::new(ConnectionEntry::new(id.clone(), info.clone(), conn));
        let entry = self
            .connections
            .entry(id.clone())
            .or_insert_with(|| Arc::clone(&candidate));
        if entry.is_fresh() {
            return Ok((candidate, true));
        }
        let existing = entry.into_value();
        let _ = self.reaper_tx.send(Evicted::DuplicateConnection(candidate));
        if existing.info() == &info {
            Ok((existing, false))
        } else {
            Err(MetaError::AlreadyExists(format!(
                "connection {} is already open with different properties",
                id
            )))
        }
    }

    pub fn connection(&self, id: &ConnectionId) -> Result<Arc<ConnectionEntry>> {
        self.connections
            .get(id)
            .ok_or_else(|| MetaError::not_found(format!("no open connection with id {}", id)))
    }

    /// Removes a connection and every statement parented to it. The caller
    /// closes the returned resources under the connection lock.
    pub fn remove_connection(
        &self,
        id: &ConnectionId,
    ) -> Option<(Arc<ConnectionEntry>, Vec<Arc<StatementEntry>>)> {
        let entry = self.connections.get(id)?;
        self.connections.invalidate(id);
        let statements = self.remove_statements_for(id);
        Some((entry, statements))
    }

    pub fn remove_statements_for(&self, id: &ConnectionId) -> Vec<Arc<StatementEntry>> {
        let mut removed = Vec::new();
        for (key, stmt) in self.statements.iter() {
            if &stmt.key().connection_id == id {
                self.statements.invalidate(key.as_ref());
                removed.push(stmt);
            }
        }
        removed
    }

    /// Allocates a statement with a server-assigned id. Ids increase
    /// monotonically and are never reused within this store's lifetime.
    pub fn create_statement(&self, connection_id: &ConnectionId) -> Arc<StatementEntry> {
        let id = self.statement_seq.fetch_add(1, Ordering::SeqCst);
        let key = StatementKey::new(connection_id.clone(), id);
        let entry = Arc::new(StatementEntry::new(key.clone()));
        self.statements.insert(key, Arc::clone(&entry));
        entry
    }

    pub fn statement(&self, key: &StatementKey) -> Result<Arc<StatementEntry>> {
        self.statements
            .get(key)
            .ok_or_else(|| MetaError::not_found(format!("no open statement with id {}", key)))
    }

    pub fn try_statement(&self, key: &StatementKey) -> Option<Arc<StatementEntry>> {
        self.statements.get(key)
    }

    pub fn remove_statement(&self, key: &StatementKey) -> Option<Arc<StatementEntry>> {
        let entry = self.statements.get(key)?;
        self.statements.invalidate(key);
        Some(entry)
    }

    /// Flushes pending cache maintenance: lazy expiries become actual
    /// removals and eviction listeners run. Called by the periodic sweep.
    pub fn run_pending_tasks(&self) {
        self.connections.run_pending_tasks();
        self.statements.run_pending_tasks();
    }

    /// Spawns the periodic sweep task.
    pub fn start_sweeper(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.run_pending_tasks();
            }
        })
    }

    /// Read-only observation surface for tests and operational probes.
    pub fn diagnostics(&self) -> StoreDiagnostics<'_> {
        StoreDiagnostics::new(self)
    }
}

async fn close_statement_cursor(entry: &Arc<StatementEntry>) {
    if let Some(mut cursor) = entry.release_cursor() {
        if let Err(e) = cursor.cursor.close().await {
            log::warn!("failed to close evicted cursor {}: {}", entry.key(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use portico_engine::mem::MemEngine;
    use portico_engine::Engine;

    use super::*;

    async fn open(engine: &MemEngine) -> Box<dyn EngineConnection> {
        engine.connect(&HashMap::new()).await.unwrap()
    }

    #[tokio::test]
    async fn register_is_idempotent_for_identical_info() {
        let engine = MemEngine::new();
        let store = SessionStore::new(SessionConfig::default());
        let id = ConnectionId::new("c1");
        let mut info = HashMap::new();
        info.insert("user".to_string(), "alice".to_string());

        let (_, fresh) = store
            .register_connection(&id, info.clone(), open(&engine).await)
            .unwrap();
        assert!(fresh);
        let (_, fresh) = store
            .register_connection(&id, info.clone(), open(&engine).await)
            .unwrap();
        assert!(!fresh);

        let mut other = info.clone();
        other.insert("user".to_string(), "bob".to_string());
        let err = store
            .register_connection(&id, other, open(&engine).await)
            .unwrap_err();
        assert!(matches!(err, MetaError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn duplicate_open_does_not_disturb_live_statements() {
        let engine = MemEngine::new();
        let store = SessionStore::new(SessionConfig::default());
        let id = ConnectionId::new("c1");
        store
            .register_connection(&id, HashMap::new(), open(&engine).await)
            .unwrap();
        let stmt = store.create_statement(&id);

        // An idempotent re-open of the same id while statements are live.
        let (_, fresh) = store
            .register_connection(&id, HashMap::new(), open(&engine).await)
            .unwrap();
        assert!(!fresh);
        // Let the reaper close the losing candidate.
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.statement(stmt.key()).is_ok());
        assert_eq!(store.diagnostics().statement_count_for(&id), 1);
        assert_ne!(stmt.state(), StatementState::Closed);
        // Only the losing engine connection was closed.
        let closes = engine.journal().iter().filter(|e| *e == "close").count();
        assert_eq!(closes, 1, "journal: {:?}", engine.journal());
    }

    #[tokio::test]
    async fn capacity_eviction_closes_engine_resources() {
        let engine = MemEngine::new();
        let store = SessionStore::new(SessionConfig {
            connection_capacity: 1,
            ..Default::default()
        });
        for i in 0..3 {
            let id = ConnectionId::new(format!("c{}", i));
            store
                .register_connection(&id, HashMap::new(), open(&engine).await)
                .unwrap();
        }
        store.run_pending_tasks();
        // Let the reaper drain.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.diagnostics().connection_count() <= 1);
        assert!(
            engine.journal().iter().any(|entry| entry == "close"),
            "eviction must close the engine connection, journal: {:?}",
            engine.journal()
        );
    }

    #[tokio::test]
    async fn idle_entries_expire() {
        let engine = MemEngine::new();
        let store = SessionStore::new(SessionConfig {
            idle_ttl: Duration::from_millis(40),
            ..Default::default()
        });
        let id = ConnectionId::new("c1");
        store
            .register_connection(&id, HashMap::new(), open(&engine).await)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        store.run_pending_tasks();
        assert!(store.connection(&id).is_err());
    }

    #[tokio::test]
    async fn statement_ids_are_monotonic_and_unique() {
        let engine = MemEngine::new();
        let store = SessionStore::new(SessionConfig::default());
        let id = ConnectionId::new("c1");
        store
            .register_connection(&id, HashMap::new(), open(&engine).await)
            .unwrap();
        let first = store.create_statement(&id);
        let second = store.create_statement(&id);
        assert!(second.key().statement_id > first.key().statement_id);
    }

    #[tokio::test]
    async fn removing_a_connection_removes_its_statements() {
        let engine = MemEngine::new();
        let store = SessionStore::new(SessionConfig::default());
        let id = ConnectionId::new("c1");
        let other = ConnectionId::new("c2");
        store
            .register_connection(&id, HashMap::new(), open(&engine).await)
            .unwrap();
        store
            .register_connection(&other, HashMap::new(), open(&engine).await)
            .unwrap();
        store.create_statement(&id);
        store.create_statement(&id);
        let keeper = store.create_statement(&other);

        let (_, removed) = store.remove_connection(&id).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(store.diagnostics().statement_count_for(&id), 0);
        assert!(store.statement(keeper.key()).is_ok());
    }
}
