//! Server-side statement entries and their cursor slot.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use portico_commons::{Signature, StatementKey};
use portico_engine::EngineCursor;

/// Statement lifecycle. `Executing` is only observable while the owning
/// connection's mutex is held; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Idle,
    Executing,
    HasCursor,
    Canceled,
    Closed,
}

/// A retained engine cursor plus the absolute row offset of the next
/// unread row. Cursors are forward-only; `position` never decreases.
pub struct CursorState {
    pub cursor: Box<dyn EngineCursor>,
    pub position: u64,
}

struct StatementInner {
    sql: Option<String>,
    signature: Option<Signature>,
    /// Total row cap fixed at prepare time; `-1` means unbounded.
    max_rows_total: i64,
    cursor: Option<CursorState>,
    state: StatementState,
}

/// One server-side statement. All mutation happens under the parent
/// connection's mutex; the short inner lock only protects the slot
/// swap itself. The cancel flag is the one out-of-band write: it is set
/// without the connection mutex and observed at the next row boundary.
pub struct StatementEntry {
    key: StatementKey,
    canceled: AtomicBool,
    inner: Mutex<StatementInner>,
}

impl StatementEntry {
    pub fn new(key: StatementKey) -> Self {
        Self {
            key,
            canceled: AtomicBool::new(false),
            inner: Mutex::new(StatementInner {
                sql: None,
                signature: None,
                max_rows_total: -1,
                cursor: None,
                state: StatementState::Idle,
            }),
        }
    }

    pub fn key(&self) -> &StatementKey {
        &self.key
    }

    /// Marks the statement's cursor canceled. Does not interrupt an
    /// in-flight engine call.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Clears the cancel flag after the cancellation error has been
    /// delivered; the statement itself stays usable.
    pub fn clear_canceled(&self) {
        self.canceled.store(false, Ordering::SeqCst);
    }

    pub fn set_prepared(&self, sql: impl Into<String>, signature: Signature, max_rows_total: i64) {
        let mut inner = self.inner.lock();
        inner.sql = Some(sql.into());
        inner.signature = Some(signature);
        inner.max_rows_total = max_rows_total;
    }

    /// Attaches a signature without SQL (server-initiated catalog cursors).
    pub fn set_signature(&self, signature: Signature) {
        self.inner.lock().signature = Some(signature);
    }

    pub fn max_rows_total(&self) -> i64 {
        self.inner.lock().max_rows_total
    }

    pub fn sql(&self) -> Option<String> {
        self.inner.lock().sql.clone()
    }

    pub fn signature(&self) -> Option<Signature> {
        self.inner.lock().signature.clone()
    }

    pub fn state(&self) -> StatementState {
        self.inner.lock().state
    }

    pub fn set_state(&self, state: StatementState) {
        self.inner.lock().state = state;
    }

    pub fn has_cursor(&self) -> bool {
        self.inner.lock().cursor.is_some()
    }

    /// Removes the cursor from its slot for the duration of an engine
    /// call. The caller holds the connection mutex, so nothing else can
    /// observe the empty slot.
    pub fn take_cursor(&self) -> Option<CursorState> {
        self.inner.lock().cursor.take()
    }

    pub fn put_cursor(&self, cursor: CursorState) {
        let mut inner = self.inner.lock();
        inner.cursor = Some(cursor);
        inner.state = StatementState::HasCursor;
    }

    /// Drops any retained cursor state, returning it so the caller can
    /// close the engine side.
    pub fn release_cursor(&self) -> Option<CursorState> {
        let mut inner = self.inner.lock();
        let cursor = inner.cursor.take();
        if inner.state == StatementState::HasCursor {
            inner.state = StatementState::Idle;
        }
        cursor
    }
}

#[cfg(test)]
mod tests {
    use portico_commons::ConnectionId;

    use super::*;

    #[test]
    fn cancel_flag_round_trip() {
        let entry = StatementEntry::new(StatementKey::new(ConnectionId::new("c1"), 1));
        assert!(!entry.is_canceled());
        entry.cancel();
        assert!(entry.is_canceled());
        entry.clear_canceled();
        assert!(!entry.is_canceled());
    }

    #[test]
    fn state_transitions() {
        let entry = StatementEntry::new(StatementKey::new(ConnectionId::new("c1"), 1));
        assert_eq!(entry.state(), StatementState::Idle);
        entry.set_state(StatementState::Executing);
        assert_eq!(entry.state(), StatementState::Executing);
        entry.set_state(StatementState::Closed);
        assert_eq!(entry.state(), StatementState::Closed);
    }
}
