//! # portico-engine
//!
//! The engine boundary of the portico gateway. The gateway treats the
//! downstream relational engine as a blackbox reachable through three
//! traits: [`Engine`] (hands out connections), [`EngineConnection`]
//! (prepared statements, execution, catalog queries, transactions), and
//! [`EngineCursor`] (forward-only row iteration).
//!
//! The [`mem`] module provides the in-memory reference engine used by the
//! server binary and by every test in the workspace.

pub mod mem;

use std::collections::HashMap;

use async_trait::async_trait;
use portico_commons::{ConnectionProps, Result, Signature, TypedValue};

/// What a single statement execution produced. A logical execute may
/// return several outcomes (stored procedures).
pub enum ExecuteOutcome {
    Rows(Box<dyn EngineCursor>),
    UpdateCount(i64),
}

impl std::fmt::Debug for ExecuteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecuteOutcome::Rows(_) => f.debug_tuple("Rows").field(&"<cursor>").finish(),
            ExecuteOutcome::UpdateCount(n) => f.debug_tuple("UpdateCount").field(n).finish(),
        }
    }
}

/// Factory for engine connections. `info` is the free-form property map
/// the client opened with (user, initial catalog, ...).
#[async_trait]
pub trait Engine: Send + Sync {
    async fn connect(&self, info: &HashMap<String, String>) -> Result<Box<dyn EngineConnection>>;
}

/// One live engine connection. Connections are never shared between
/// handler tasks concurrently; the session store serializes access.
///
/// Row caps passed to [`execute`](Self::execute): negative means
/// unbounded, zero means an empty result with a valid signature, positive
/// caps the total row count.
#[async_trait]
pub trait EngineConnection: Send {
    /// Pushes property overrides (auto-commit, read-only, catalog, schema,
    /// isolation) down to the engine.
    async fn apply_props(&mut self, props: &ConnectionProps) -> Result<()>;

    /// Parses SQL and returns the statement's parameter and column
    /// signatures without executing.
    async fn prepare(&mut self, sql: &str) -> Result<Signature>;

    async fn execute(
        &mut self,
        sql: &str,
        params: &[TypedValue],
        max_rows_total: i64,
    ) -> Result<Vec<ExecuteOutcome>>;

    /// Executes one prepared statement once per parameter row.
    async fn execute_batch(
        &mut self,
        sql: &str,
        param_rows: &[Vec<TypedValue>],
    ) -> Result<Vec<i64>>;

    /// Executes a sequence of SQL commands, returning one update count each.
    async fn execute_sql_batch(&mut self, sql_commands: &[String]) -> Result<Vec<i64>>;

    // Catalog queries. Answers stream through cursors like any query
    // result; implementations must not buffer eagerly.

    async fn schemas(
        &mut self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
    ) -> Result<Box<dyn EngineCursor>>;

    async fn tables(
        &mut self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        type_list: Option<&[String]>,
    ) -> Result<Box<dyn EngineCursor>>;

    async fn columns(
        &mut self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        column_pattern: Option<&str>,
    ) -> Result<Box<dyn EngineCursor>>;

    async fn type_info(&mut self) -> Result<Box<dyn EngineCursor>>;

    /// Engine metadata: version, supported features.
    async fn database_props(&mut self) -> Result<HashMap<String, TypedValue>>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()>;
}

/// Forward-only iterator over a result set held engine-side.
#[async_trait]
pub trait EngineCursor: Send {
    fn signature(&self) -> &Signature;

    /// Reads up to `max_rows` rows. The second element is true iff the
    /// cursor is exhausted after this batch.
    async fn next_batch(&mut self, max_rows: usize) -> Result<(Vec<Vec<TypedValue>>, bool)>;

    async fn close(&mut self) -> Result<()>;
}
