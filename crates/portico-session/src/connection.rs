//! Server-side connection entries.

use std::collections::HashMap;

use portico_commons::{ConnectionId, ConnectionProps};
use portico_engine::EngineConnection;
use tokio::sync::{Mutex, MutexGuard};

/// Mutable state guarded by the per-connection mutex: the engine resource
/// and the local (client-view) property overrides with their dirty bit.
pub struct ConnectionState {
    pub conn: Box<dyn EngineConnection>,
    pub props: ConnectionProps,
}

/// One live connection owned by the session store. The `info` map the
/// client opened with is kept immutable so a repeated open can be checked
/// for idempotency without taking the lock.
pub struct ConnectionEntry {
    id: ConnectionId,
    info: HashMap<String, String>,
    state: Mutex<ConnectionState>,
}

impl std::fmt::Debug for ConnectionEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionEntry")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl ConnectionEntry {
    pub fn new(
        id: ConnectionId,
        info: HashMap<String, String>,
        conn: Box<dyn EngineConnection>,
    ) -> Self {
        Self {
            id,
            info,
            state: Mutex::new(ConnectionState {
                conn,
                props: ConnectionProps::default(),
            }),
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn info(&self) -> &HashMap<String, String> {
        &self.info
    }

    /// Acquires the per-connection mutex. Held across the engine call;
    /// release on every exit path is guaranteed by the guard.
    pub async fn lock(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().await
    }
}
