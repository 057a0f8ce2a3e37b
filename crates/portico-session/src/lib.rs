//! # portico-session
//!
//! The gateway's session store: in-memory, capacity-bounded caches of live
//! engine connections and server-side statements, keyed by identifier,
//! with idle-expiry eviction.
//!
//! Concurrency discipline: each connection owns one asynchronous mutex;
//! every operation touching the connection or any of its child statements
//! holds that mutex for the duration of the engine call, so requests
//! against one connection serialize while distinct connections make
//! progress in parallel. Statements carry no mutex of their own.
//!
//! Evicted entries are handed to a reaper task that closes the underlying
//! engine resource best-effort: a handler still holding the entry's `Arc`
//! and mutex keeps the resource alive until release, then the close runs.

pub mod connection;
pub mod delegation;
pub mod diagnostics;
pub mod statement;
pub mod store;

pub use connection::{ConnectionEntry, ConnectionState};
pub use delegation::{DelegationCallback, DelegationContext, RequestContext};
pub use diagnostics::StoreDiagnostics;
pub use statement::{CursorState, StatementEntry, StatementState};
pub use store::{SessionConfig, SessionStore};
