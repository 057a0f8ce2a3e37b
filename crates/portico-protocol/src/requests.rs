//! Request variants.
//!
//! Each variant is a standalone struct (the binary serializer encodes the
//! struct behind a class-identifier envelope) wrapped by the [`Request`]
//! enum whose `request` field is the textual discriminator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use portico_commons::{ConnectionId, ConnectionProps, Signature, StatementId, TypedValue};

/// Identifies a server-side statement; responses attach the signature once
/// the statement has been prepared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementHandle {
    pub connection_id: ConnectionId,
    pub id: StatementId,
    pub signature: Option<Signature>,
}

impl StatementHandle {
    pub fn new(connection_id: ConnectionId, id: StatementId) -> Self {
        Self {
            connection_id,
            id,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// Cursor provenance used by `syncResults` to re-establish a client cursor
/// after the server lost it: either plain SQL or a named catalog operation
/// with its filter arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryState {
    pub sql: Option<String>,
    pub op: Option<String>,
}

impl QueryState {
    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            op: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConnectionRequest {
    pub connection_id: ConnectionId,
    /// Free-form driver properties (user, initial catalog, ...). Opening
    /// the same id with an identical map is idempotent; a conflicting map
    /// fails.
    pub info: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseConnectionRequest {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSyncRequest {
    pub connection_id: ConnectionId,
    pub conn_props: ConnectionProps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabasePropertyRequest {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemasRequest {
    pub connection_id: ConnectionId,
    pub catalog: Option<String>,
    pub schema_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesRequest {
    pub connection_id: ConnectionId,
    pub catalog: Option<String>,
    pub schema_pattern: Option<String>,
    pub table_name_pattern: Option<String>,
    pub type_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsRequest {
    pub connection_id: ConnectionId,
    pub catalog: Option<String>,
    pub schema_pattern: Option<String>,
    pub table_name_pattern: Option<String>,
    pub column_name_pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeInfoRequest {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatementRequest {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseStatementRequest {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    pub connection_id: ConnectionId,
    pub sql: String,
    /// Total row cap; `0` and `-1` both mean unbounded.
    pub max_rows_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub statement_handle: StatementHandle,
    pub parameter_values: Vec<TypedValue>,
    /// Row cap for the first returned frame.
    pub first_frame_max_size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareAndExecuteRequest {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    pub sql: String,
    /// Total row cap. On this fused path `0` keeps its historical meaning:
    /// an empty result with a valid signature; `-1` means unbounded.
    pub max_rows_total: i64,
    pub first_frame_max_size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteBatchRequest {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    /// One row of parameter values per batched execution.
    pub parameter_values: Vec<Vec<TypedValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareAndExecuteBatchRequest {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    pub sql_commands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    /// Absolute row offset the frame should start at; cursors are
    /// forward-only.
    pub offset: u64,
    pub frame_max_size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResultsRequest {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    pub state: QueryState,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    pub connection_id: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub connection_id: ConnectionId,
}

/// The closed request set. The serialized discriminator is the `request`
/// field in the textual form and the envelope class identifier in the
/// binary form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "camelCase")]
pub enum Request {
    OpenConnection(OpenConnectionRequest),
    CloseConnection(CloseConnectionRequest),
    ConnectionSync(ConnectionSyncRequest),
    DatabaseProperty(DatabasePropertyRequest),
    GetSchemas(SchemasRequest),
    GetTables(TablesRequest),
    GetColumns(ColumnsRequest),
    GetTypeInfo(TypeInfoRequest),
    CreateStatement(CreateStatementRequest),
    CloseStatement(CloseStatementRequest),
    Prepare(PrepareRequest),
    Execute(ExecuteRequest),
    PrepareAndExecute(PrepareAndExecuteRequest),
    ExecuteBatch(ExecuteBatchRequest),
    PrepareAndExecuteBatch(PrepareAndExecuteBatchRequest),
    Fetch(FetchRequest),
    SyncResults(SyncResultsRequest),
    Commit(CommitRequest),
    Rollback(RollbackRequest),
}

impl Request {
    /// The connection the request operates on.
    pub fn connection_id(&self) -> &ConnectionId {
        match self {
            Request::OpenConnection(r) => &r.connection_id,
            Request::CloseConnection(r) => &r.connection_id,
            Request::ConnectionSync(r) => &r.connection_id,
            Request::DatabaseProperty(r) => &r.connection_id,
            Request::GetSchemas(r) => &r.connection_id,
            Request::GetTables(r) => &r.connection_id,
            Request::GetColumns(r) => &r.connection_id,
            Request::GetTypeInfo(r) => &r.connection_id,
            Request::CreateStatement(r) => &r.connection_id,
            Request::CloseStatement(r) => &r.connection_id,
            Request::Prepare(r) => &r.connection_id,
            Request::Execute(r) => &r.statement_handle.connection_id,
            Request::PrepareAndExecute(r) => &r.connection_id,
            Request::ExecuteBatch(r) => &r.connection_id,
            Request::PrepareAndExecuteBatch(r) => &r.connection_id,
            Request::Fetch(r) => &r.connection_id,
            Request::SyncResults(r) => &r.connection_id,
            Request::Commit(r) => &r.connection_id,
            Request::Rollback(r) => &r.connection_id,
        }
    }
}
