//! Shared error types for portico.
//!
//! Every server-side failure funnels into [`MetaError`] so the transport
//! layer can translate it into a single wire error envelope. Engine
//! failures keep their cause chain as an ordered list of strings; the
//! client rebuilds the chain on its side.

use thiserror::Error;

/// Sentinel error code carried on the wire when the engine supplied none.
pub const UNKNOWN_ERROR_CODE: i32 = -1;

/// Sentinel SQLSTATE carried on the wire when the engine supplied none.
pub const UNKNOWN_SQL_STATE: &str = "00000";

/// Result type alias using [`MetaError`].
pub type Result<T> = std::result::Result<T, MetaError>;

/// Errors raised by the gateway's meta layer, session store, and codecs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetaError {
    /// A value failed codec validation (type mismatch, negative decimal
    /// scale, conflicting array element tag).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Parameter binding rejected: arity or type mismatch against the
    /// prepared parameter signature.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation against an unknown or evicted connection/statement id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Connection id collision with conflicting properties.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The delegation callback refused to establish an authorization
    /// context for the remote user.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A canceled cursor was advanced past its next row boundary.
    #[error("Statement canceled")]
    StatementCanceled,

    /// Fetch asked for an offset behind the forward-only cursor.
    #[error("Cursor offset out of range: requested {requested}, cursor is at {position}")]
    OffsetOutOfRange { requested: u64, position: u64 },

    /// Failure reported by the downstream engine. `causes` holds the
    /// engine-side cause chain, outermost first.
    #[error("{message}")]
    Engine {
        message: String,
        error_code: i32,
        sql_state: String,
        causes: Vec<String>,
    },

    /// Malformed envelope, unknown discriminator, or invalid tag.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Unexpected internal state.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MetaError {
    /// Creates an InvalidInput error with a message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an InvalidParameter error with a message.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Creates a NotFound error with a message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates an engine error with sentinel code/state and a single cause.
    pub fn engine(msg: impl Into<String>) -> Self {
        let message = msg.into();
        Self::Engine {
            causes: vec![message.clone()],
            message,
            error_code: UNKNOWN_ERROR_CODE,
            sql_state: UNKNOWN_SQL_STATE.to_string(),
        }
    }

    /// Creates an engine error for a failed SQL execution, embedding the
    /// offending statement text in the message.
    pub fn engine_with_sql(sql: &str, cause: impl Into<String>) -> Self {
        let cause = cause.into();
        let message = format!("Error while executing SQL \"{}\": {}", sql, cause);
        Self::Engine {
            causes: vec![message.clone(), cause],
            message,
            error_code: UNKNOWN_ERROR_CODE,
            sql_state: UNKNOWN_SQL_STATE.to_string(),
        }
    }

    /// Error code reported on the wire.
    pub fn error_code(&self) -> i32 {
        match self {
            MetaError::Engine { error_code, .. } => *error_code,
            _ => UNKNOWN_ERROR_CODE,
        }
    }

    /// SQLSTATE reported on the wire.
    pub fn sql_state(&self) -> String {
        match self {
            MetaError::Engine { sql_state, .. } => sql_state.clone(),
            _ => UNKNOWN_SQL_STATE.to_string(),
        }
    }

    /// Human-readable diagnostic chain for the wire envelope, outermost
    /// cause first. Non-engine errors carry their own message as the only
    /// entry.
    pub fn stack_traces(&self) -> Vec<String> {
        match self {
            MetaError::Engine { causes, .. } if !causes.is_empty() => causes.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_embeds_sql_text() {
        let err = MetaError::engine_with_sql("select * from buffer", "Object 'BUFFER' not found");
        assert_eq!(
            err.to_string(),
            "Error while executing SQL \"select * from buffer\": Object 'BUFFER' not found"
        );
        assert_eq!(err.error_code(), UNKNOWN_ERROR_CODE);
        assert_eq!(err.sql_state(), UNKNOWN_SQL_STATE);
    }

    #[test]
    fn stack_traces_preserve_cause_chain() {
        let err = MetaError::engine_with_sql("select 1", "boom");
        let traces = err.stack_traces();
        assert_eq!(traces.len(), 2);
        assert!(traces[0].contains("select 1"));
        assert_eq!(traces[1], "boom");
    }

    #[test]
    fn canceled_message_is_fixed() {
        assert_eq!(MetaError::StatementCanceled.to_string(), "Statement canceled");
    }

    #[test]
    fn non_engine_errors_use_sentinels() {
        let err = MetaError::not_found("connection c1");
        assert_eq!(err.error_code(), -1);
        assert_eq!(err.sql_state(), "00000");
        assert_eq!(err.stack_traces(), vec!["Not found: connection c1".to_string()]);
    }
}
