//! # portico-protocol
//!
//! The wire contract of the portico gateway: the closed sets of request
//! and response variants, and the two interchangeable serializers that
//! carry them (a self-describing JSON form and a compact binary form).
//!
//! Both sides of the protocol (server dispatcher, client driver) speak
//! through the [`Translator`] trait; serialization is selected per request
//! by HTTP content type. Serialize-then-parse yields an equal message for
//! every variant in either serializer; unknown discriminators produce a
//! structured protocol error, never silent discarding.

pub mod requests;
pub mod responses;
pub mod translator;

pub use requests::{
    ColumnsRequest, CommitRequest, ConnectionSyncRequest, CreateStatementRequest,
    CloseConnectionRequest, CloseStatementRequest, DatabasePropertyRequest, ExecuteBatchRequest,
    ExecuteRequest, FetchRequest, OpenConnectionRequest, PrepareAndExecuteBatchRequest,
    PrepareAndExecuteRequest, PrepareRequest, QueryState, Request, RollbackRequest,
    SchemasRequest, StatementHandle, SyncResultsRequest, TablesRequest, TypeInfoRequest,
};
pub use responses::{
    CloseConnectionResponse, CloseStatementResponse, CommitResponse, ConnectionSyncResponse,
    CreateStatementResponse, DatabasePropertyResponse, ErrorResponse, ErrorSeverity,
    ExecuteBatchResponse, ExecuteResponse, FetchResponse, OpenConnectionResponse,
    PrepareResponse, Response, ResultSetResponse, RollbackResponse, RpcMetadata,
    SyncResultsResponse,
};
pub use translator::{
    for_content_type, BinaryTranslator, JsonTranslator, Translator, CONTENT_TYPE_BINARY,
    CONTENT_TYPE_JSON,
};
