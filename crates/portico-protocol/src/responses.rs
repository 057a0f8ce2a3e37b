//! Response variants and the wire error envelope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use portico_commons::{
    ConnectionId, ConnectionProps, Frame, MetaError, StatementId, TypedValue,
};

use crate::requests::StatementHandle;

/// Envelope fields attached to every response so clients can pin affinity
/// to the server that answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcMetadata {
    /// `<hostname>:<port>` of the answering server.
    pub server_address: String,
}

impl RpcMetadata {
    pub fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Unknown,
    Fatal,
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConnectionResponse {
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseConnectionResponse {
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSyncResponse {
    /// The server's post-apply view of the connection properties.
    pub conn_props: ConnectionProps,
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabasePropertyResponse {
    pub props: HashMap<String, TypedValue>,
    pub rpc_metadata: RpcMetadata,
}

/// One result set: the column signature plus the first frame, or an update
/// count for DML. `update_count == -1` marks a row-returning result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetResponse {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    /// True when the server allocated the statement itself (metadata
    /// queries) and the client should close it when done.
    pub own_statement: bool,
    pub signature: Option<portico_commons::Signature>,
    pub first_frame: Option<Frame>,
    pub update_count: i64,
    pub rpc_metadata: RpcMetadata,
}

impl ResultSetResponse {
    pub const NO_UPDATE_COUNT: i64 = -1;

    pub fn is_update(&self) -> bool {
        self.update_count != Self::NO_UPDATE_COUNT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub results: Vec<ResultSetResponse>,
    /// Set when the referenced statement was not found (evicted); the
    /// client should re-prepare and retry.
    pub missing_statement: bool,
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResponse {
    pub statement: StatementHandle,
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResponse {
    pub frame: Frame,
    pub missing_statement: bool,
    /// Set when the statement exists but its cursor is gone; the client
    /// should `syncResults` to re-establish it.
    pub missing_results: bool,
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatementResponse {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseStatementResponse {
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteBatchResponse {
    pub connection_id: ConnectionId,
    pub statement_id: StatementId,
    pub update_counts: Vec<i64>,
    pub missing_statement: bool,
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResultsResponse {
    pub missing_statement: bool,
    /// True when the server re-established a cursor and rows remain past
    /// the requested offset.
    pub more_results: bool,
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResponse {
    pub rpc_metadata: RpcMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackResponse {
    pub rpc_metadata: RpcMetadata,
}

/// The wire error envelope. `error_code == -1` and `sql_state == "00000"`
/// are the sentinel unknown values; `stack_traces` preserves the
/// server-side cause chain, outermost first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error_message: String,
    pub error_code: i32,
    pub sql_state: String,
    pub severity: ErrorSeverity,
    pub stack_traces: Vec<String>,
    pub rpc_metadata: RpcMetadata,
}

impl ErrorResponse {
    pub fn from_meta_error(error: &MetaError, rpc_metadata: RpcMetadata) -> Self {
        Self {
            error_message: error.to_string(),
            error_code: error.error_code(),
            sql_state: error.sql_state(),
            severity: ErrorSeverity::Error,
            stack_traces: error.stack_traces(),
            rpc_metadata,
        }
    }
}

/// The closed response set, mirroring [`crate::requests::Request`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "camelCase")]
pub enum Response {
    OpenConnection(OpenConnectionResponse),
    CloseConnection(CloseConnectionResponse),
    ConnectionSync(ConnectionSyncResponse),
    DatabaseProperty(DatabasePropertyResponse),
    ResultSet(ResultSetResponse),
    Execute(ExecuteResponse),
    Prepare(PrepareResponse),
    Fetch(FetchResponse),
    CreateStatement(CreateStatementResponse),
    CloseStatement(CloseStatementResponse),
    ExecuteBatch(ExecuteBatchResponse),
    SyncResults(SyncResultsResponse),
    Commit(CommitResponse),
    Rollback(RollbackResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn error(error: &MetaError, rpc_metadata: RpcMetadata) -> Self {
        Response::Error(ErrorResponse::from_meta_error(error, rpc_metadata))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}
