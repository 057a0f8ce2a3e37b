//! # portico-commons
//!
//! Shared types for the portico remote database gateway.
//!
//! This crate provides the vocabulary used across all portico crates
//! (portico-engine, portico-protocol, portico-session, portico-meta,
//! portico-server, portico-link): typed values and their codec rules,
//! column/parameter metadata, result frames, connection properties, id
//! wrappers, and the common error type. It stays dependency-light to
//! prevent circular dependency issues.
//!
//! ## Type-Safe Wrappers
//!
//! - [`ConnectionId`]: client-chosen connection identifier
//! - [`StatementKey`]: (connection, statement) pair identifying a server statement
//!
//! ## Example Usage
//!
//! ```rust
//! use portico_commons::{ConnectionId, TypedValue};
//!
//! let conn_id = ConnectionId::new("8a6e3d2c-conn");
//! let value = TypedValue::Long(42);
//! assert_eq!(conn_id.as_str(), "8a6e3d2c-conn");
//! assert_eq!(value.rep(), portico_commons::Rep::Long);
//! ```

pub mod errors;
pub mod frame;
pub mod ids;
pub mod props;
pub mod signature;
pub mod typed_value;

// Re-export commonly used types at crate root
pub use errors::{MetaError, Result, UNKNOWN_ERROR_CODE, UNKNOWN_SQL_STATE};
pub use frame::Frame;
pub use ids::{ConnectionId, StatementId, StatementKey};
pub use props::ConnectionProps;
pub use signature::{ColumnMetaData, ParameterMetaData, Signature};
pub use typed_value::{ArrayValue, DecimalValue, Rep, TypedValue};

/// Gateway build version, reported through the `GATEWAY_VERSION` database
/// property and compared by clients against their own build.
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");
