//! # portico-meta
//!
//! The stateful engine façade of the portico gateway. [`MetaService`]
//! dispatches every request variant through a single match keyed on the
//! discriminator, drives the connection and statement state machines in
//! the session store, materializes result frames from engine cursors, and
//! converts every failure into the wire error envelope.
//!
//! Control flow is synchronous per request: one request, one response.
//! Streaming happens only through frame paging via follow-up `fetch`
//! requests against the server-held cursor.

mod cursors;
mod service;

pub use service::{MetaService, DEFAULT_FRAME_SIZE};
