//! The two interchangeable serializers.
//!
//! The textual form is self-describing JSON with a discriminator field.
//! The binary form wraps every message in a [`MessageEnvelope`] carrying a
//! class-identifier string plus the bincode-encoded variant body; a
//! dispatch table keyed on the class identifier decodes. Content type
//! selects the serializer, symmetrically on both protocol sides.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use portico_commons::{MetaError, Result};

use crate::requests::Request;
use crate::responses::Response;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// A lossless serializer for protocol messages.
pub trait Translator: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn serialize_request(&self, request: &Request) -> Result<Vec<u8>>;
    fn parse_request(&self, body: &[u8]) -> Result<Request>;
    fn serialize_response(&self, response: &Response) -> Result<Vec<u8>>;
    fn parse_response(&self, body: &[u8]) -> Result<Response>;
}

/// Selects a translator from an HTTP content type, tolerating parameters
/// such as charset suffixes.
pub fn for_content_type(content_type: &str) -> Option<&'static dyn Translator> {
    let ct = content_type.to_ascii_lowercase();
    if ct.contains("json") {
        Some(&JsonTranslator)
    } else if ct.contains("octet-stream") {
        Some(&BinaryTranslator)
    } else {
        None
    }
}

/// Textual serializer: self-describing JSON.
pub struct JsonTranslator;

impl Translator for JsonTranslator {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    fn serialize_request(&self, request: &Request) -> Result<Vec<u8>> {
        to_json(request)
    }

    fn parse_request(&self, body: &[u8]) -> Result<Request> {
        from_json(body)
    }

    fn serialize_response(&self, response: &Response) -> Result<Vec<u8>> {
        to_json(response)
    }

    fn parse_response(&self, body: &[u8]) -> Result<Response> {
        from_json(body)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| MetaError::Protocol(format!("failed to serialize message: {}", e)))
}

fn from_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        use serde_json::error::Category;
        match e.classify() {
            Category::Data => MetaError::Protocol(format!("Malformed message: {}", e)),
            _ => MetaError::Protocol(format!("Illegal character in message body: {}", e)),
        }
    })
}

/// Outer wrapper of the binary form: a class-identifier string plus the
/// opaque encoded body of that variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MessageEnvelope {
    class_id: String,
    payload: Vec<u8>,
}

mod class_id {
    pub const OPEN_CONNECTION: &str = "portico.rpc.openConnection";
    pub const CLOSE_CONNECTION: &str = "portico.rpc.closeConnection";
    pub const CONNECTION_SYNC: &str = "portico.rpc.connectionSync";
    pub const DATABASE_PROPERTY: &str = "portico.rpc.databaseProperty";
    pub const GET_SCHEMAS: &str = "portico.rpc.getSchemas";
    pub const GET_TABLES: &str = "portico.rpc.getTables";
    pub const GET_COLUMNS: &str = "portico.rpc.getColumns";
    pub const GET_TYPE_INFO: &str = "portico.rpc.getTypeInfo";
    pub const CREATE_STATEMENT: &str = "portico.rpc.createStatement";
    pub const CLOSE_STATEMENT: &str = "portico.rpc.closeStatement";
    pub const PREPARE: &str = "portico.rpc.prepare";
    pub const EXECUTE: &str = "portico.rpc.execute";
    pub const PREPARE_AND_EXECUTE: &str = "portico.rpc.prepareAndExecute";
    pub const EXECUTE_BATCH: &str = "portico.rpc.executeBatch";
    pub const PREPARE_AND_EXECUTE_BATCH: &str = "portico.rpc.prepareAndExecuteBatch";
    pub const FETCH: &str = "portico.rpc.fetch";
    pub const SYNC_RESULTS: &str = "portico.rpc.syncResults";
    pub const COMMIT: &str = "portico.rpc.commit";
    pub const ROLLBACK: &str = "portico.rpc.rollback";

    pub const OPEN_CONNECTION_RESPONSE: &str = "portico.rpc.openConnectionResponse";
    pub const CLOSE_CONNECTION_RESPONSE: &str = "portico.rpc.closeConnectionResponse";
    pub const CONNECTION_SYNC_RESPONSE: &str = "portico.rpc.connectionSyncResponse";
    pub const DATABASE_PROPERTY_RESPONSE: &str = "portico.rpc.databasePropertyResponse";
    pub const RESULT_SET_RESPONSE: &str = "portico.rpc.resultSetResponse";
    pub const EXECUTE_RESPONSE: &str = "portico.rpc.executeResponse";
    pub const PREPARE_RESPONSE: &str = "portico.rpc.prepareResponse";
    pub const FETCH_RESPONSE: &str = "portico.rpc.fetchResponse";
    pub const CREATE_STATEMENT_RESPONSE: &str = "portico.rpc.createStatementResponse";
    pub const CLOSE_STATEMENT_RESPONSE: &str = "portico.rpc.closeStatementResponse";
    pub const EXECUTE_BATCH_RESPONSE: &str = "portico.rpc.executeBatchResponse";
    pub const SYNC_RESULTS_RESPONSE: &str = "portico.rpc.syncResultsResponse";
    pub const COMMIT_RESPONSE: &str = "portico.rpc.commitResponse";
    pub const ROLLBACK_RESPONSE: &str = "portico.rpc.rollbackResponse";
    pub const ERROR_RESPONSE: &str = "portico.rpc.errorResponse";
}

/// Binary serializer: envelope + bincode bodies.
pub struct BinaryTranslator;

impl Translator for BinaryTranslator {
    fn content_type(&self) -> &'static str {
        CONTENT_TYPE_BINARY
    }

    fn serialize_request(&self, request: &Request) -> Result<Vec<u8>> {
        let (class_id, payload) = match request {
            Request::OpenConnection(body) => (class_id::OPEN_CONNECTION, encode_body(body)?),
            Request::CloseConnection(body) => (class_id::CLOSE_CONNECTION, encode_body(body)?),
            Request::ConnectionSync(body) => (class_id::CONNECTION_SYNC, encode_body(body)?),
            Request::DatabaseProperty(body) => (class_id::DATABASE_PROPERTY, encode_body(body)?),
            Request::GetSchemas(body) => (class_id::GET_SCHEMAS, encode_body(body)?),
            Request::GetTables(body) => (class_id::GET_TABLES, encode_body(body)?),
            Request::GetColumns(body) => (class_id::GET_COLUMNS, encode_body(body)?),
            Request::GetTypeInfo(body) => (class_id::GET_TYPE_INFO, encode_body(body)?),
            Request::CreateStatement(body) => (class_id::CREATE_STATEMENT, encode_body(body)?),
            Request::CloseStatement(body) => (class_id::CLOSE_STATEMENT, encode_body(body)?),
            Request::Prepare(body) => (class_id::PREPARE, encode_body(body)?),
            Request::Execute(body) => (class_id::EXECUTE, encode_body(body)?),
            Request::PrepareAndExecute(body) => (class_id::PREPARE_AND_EXECUTE, encode_body(body)?),
            Request::ExecuteBatch(body) => (class_id::EXECUTE_BATCH, encode_body(body)?),
            Request::PrepareAndExecuteBatch(body) => {
                (class_id::PREPARE_AND_EXECUTE_BATCH, encode_body(body)?)
            }
            Request::Fetch(body) => (class_id::FETCH, encode_body(body)?),
            Request::SyncResults(body) => (class_id::SYNC_RESULTS, encode_body(body)?),
            Request::Commit(body) => (class_id::COMMIT, encode_body(body)?),
            Request::Rollback(body) => (class_id::ROLLBACK, encode_body(body)?),
        };
        encode_envelope(class_id, payload)
    }

    fn parse_request(&self, body: &[u8]) -> Result<Request> {
        let envelope = decode_envelope(body)?;
        let id = envelope.class_id.as_str();
        let payload = envelope.payload.as_slice();
        let request = match id {
            class_id::OPEN_CONNECTION => Request::OpenConnection(decode_body(id, payload)?),
            class_id::CLOSE_CONNECTION => Request::CloseConnection(decode_body(id, payload)?),
            class_id::CONNECTION_SYNC => Request::ConnectionSync(decode_body(id, payload)?),
            class_id::DATABASE_PROPERTY => Request::DatabaseProperty(decode_body(id, payload)?),
            class_id::GET_SCHEMAS => Request::GetSchemas(decode_body(id, payload)?),
            class_id::GET_TABLES => Request::GetTables(decode_body(id, payload)?),
            class_id::GET_COLUMNS => Request::GetColumns(decode_body(id, payload)?),
            class_id::GET_TYPE_INFO => Request::GetTypeInfo(decode_body(id, payload)?),
            class_id::CREATE_STATEMENT => Request::CreateStatement(decode_body(id, payload)?),
            class_id::CLOSE_STATEMENT => Request::CloseStatement(decode_body(id, payload)?),
            class_id::PREPARE => Request::Prepare(decode_body(id, payload)?),
            class_id::EXECUTE => Request::Execute(decode_body(id, payload)?),
            class_id::PREPARE_AND_EXECUTE => Request::PrepareAndExecute(decode_body(id, payload)?),
            class_id::EXECUTE_BATCH => Request::ExecuteBatch(decode_body(id, payload)?),
            class_id::PREPARE_AND_EXECUTE_BATCH => {
                Request::PrepareAndExecuteBatch(decode_body(id, payload)?)
            }
            class_id::FETCH => Request::Fetch(decode_body(id, payload)?),
            class_id::SYNC_RESULTS => Request::SyncResults(decode_body(id, payload)?),
            class_id::COMMIT => Request::Commit(decode_body(id, payload)?),
            class_id::ROLLBACK => Request::Rollback(decode_body(id, payload)?),
            other => return Err(unknown_class_id(other)),
        };
        Ok(request)
    }

    fn serialize_response(&self, response: &Response) -> Result<Vec<u8>> {
        let (class_id, payload) = match response {
            Response::OpenConnection(body) => {
                (class_id::OPEN_CONNECTION_RESPONSE, encode_body(body)?)
            }
            Response::CloseConnection(body) => {
                (class_id::CLOSE_CONNECTION_RESPONSE, encode_body(body)?)
            }
            Response::ConnectionSync(body) => {
                (class_id::CONNECTION_SYNC_RESPONSE, encode_body(body)?)
            }
            Response::DatabaseProperty(body) => {
                (class_id::DATABASE_PROPERTY_RESPONSE, encode_body(body)?)
            }
            Response::ResultSet(body) => (class_id::RESULT_SET_RESPONSE, encode_body(body)?),
            Response::Execute(body) => (class_id::EXECUTE_RESPONSE, encode_body(body)?),
            Response::Prepare(body) => (class_id::PREPARE_RESPONSE, encode_body(body)?),
            Response::Fetch(body) => (class_id::FETCH_RESPONSE, encode_body(body)?),
            Response::CreateStatement(body) => {
                (class_id::CREATE_STATEMENT_RESPONSE, encode_body(body)?)
            }
            Response::CloseStatement(body) => {
                (class_id::CLOSE_STATEMENT_RESPONSE, encode_body(body)?)
            }
            Response::ExecuteBatch(body) => (class_id::EXECUTE_BATCH_RESPONSE, encode_body(body)?),
            Response::SyncResults(body) => (class_id::SYNC_RESULTS_RESPONSE, encode_body(body)?),
            Response::Commit(body) => (class_id::COMMIT_RESPONSE, encode_body(body)?),
            Response::Rollback(body) => (class_id::ROLLBACK_RESPONSE, encode_body(body)?),
            Response::Error(body) => (class_id::ERROR_RESPONSE, encode_body(body)?),
        };
        encode_envelope(class_id, payload)
    }

    fn parse_response(&self, body: &[u8]) -> Result<Response> {
        let envelope = decode_envelope(body)?;
        let id = envelope.class_id.as_str();
        let payload = envelope.payload.as_slice();
        let response = match id {
            class_id::OPEN_CONNECTION_RESPONSE => {
                Response::OpenConnection(decode_body(id, payload)?)
            }
            class_id::CLOSE_CONNECTION_RESPONSE => {
                Response::CloseConnection(decode_body(id, payload)?)
            }
            class_id::CONNECTION_SYNC_RESPONSE => {
                Response::ConnectionSync(decode_body(id, payload)?)
            }
            class_id::DATABASE_PROPERTY_RESPONSE => {
                Response::DatabaseProperty(decode_body(id, payload)?)
            }
            class_id::RESULT_SET_RESPONSE => Response::ResultSet(decode_body(id, payload)?),
            class_id::EXECUTE_RESPONSE => Response::Execute(decode_body(id, payload)?),
            class_id::PREPARE_RESPONSE => Response::Prepare(decode_body(id, payload)?),
            class_id::FETCH_RESPONSE => Response::Fetch(decode_body(id, payload)?),
            class_id::CREATE_STATEMENT_RESPONSE => {
                Response::CreateStatement(decode_body(id, payload)?)
            }
            class_id::CLOSE_STATEMENT_RESPONSE => {
                Response::CloseStatement(decode_body(id, payload)?)
            }
            class_id::EXECUTE_BATCH_RESPONSE => Response::ExecuteBatch(decode_body(id, payload)?),
            class_id::SYNC_RESULTS_RESPONSE => Response::SyncResults(decode_body(id, payload)?),
            class_id::COMMIT_RESPONSE => Response::Commit(decode_body(id, payload)?),
            class_id::ROLLBACK_RESPONSE => Response::Rollback(decode_body(id, payload)?),
            class_id::ERROR_RESPONSE => Response::Error(decode_body(id, payload)?),
            other => return Err(unknown_class_id(other)),
        };
        Ok(response)
    }
}

fn encode_body<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| MetaError::Protocol(format!("failed to encode message body: {}", e)))
}

fn decode_body<T: DeserializeOwned>(class_id: &str, payload: &[u8]) -> Result<T> {
    bincode::serde::decode_from_slice(payload, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| {
            MetaError::Protocol(format!(
                "message body for {} contained an invalid tag: {}",
                class_id, e
            ))
        })
}

fn encode_envelope(class_id: &str, payload: Vec<u8>) -> Result<Vec<u8>> {
    let envelope = MessageEnvelope {
        class_id: class_id.to_string(),
        payload,
    };
    bincode::serde::encode_to_vec(&envelope, bincode::config::standard())
        .map_err(|e| MetaError::Protocol(format!("failed to encode message envelope: {}", e)))
}

fn decode_envelope(body: &[u8]) -> Result<MessageEnvelope> {
    bincode::serde::decode_from_slice(body, bincode::config::standard())
        .map(|(envelope, _)| envelope)
        .map_err(|e| {
            MetaError::Protocol(format!("message envelope contained an invalid tag: {}", e))
        })
}

fn unknown_class_id(class_id: &str) -> MetaError {
    MetaError::Protocol(format!(
        "message envelope contained an invalid tag: unknown class identifier {:?}",
        class_id
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use portico_commons::{
        ColumnMetaData, ConnectionId, ConnectionProps, DecimalValue, Frame, ParameterMetaData,
        Rep, Signature, TypedValue,
    };

    use super::*;
    use crate::requests::*;
    use crate::responses::*;

    fn conn() -> ConnectionId {
        ConnectionId::new("1fdd5b1e-test-conn")
    }

    fn rpc() -> RpcMetadata {
        RpcMetadata::new("gateway-host:8765")
    }

    fn sample_signature() -> Signature {
        Signature::new(
            vec![
                ColumnMetaData::new(0, "id", Rep::Long),
                ColumnMetaData::new(1, "amount", Rep::Decimal).with_precision_scale(12, 5),
                ColumnMetaData::array(2, "tags", Rep::String),
            ],
            vec![ParameterMetaData::new(1, Rep::Long)],
            Some("select id, amount, tags from t where id = ?".to_string()),
        )
    }

    fn sample_frame() -> Frame {
        Frame::new(
            0,
            false,
            vec![vec![
                TypedValue::Long(i64::MAX),
                TypedValue::Decimal(DecimalValue::new("1234567890", 5).unwrap()),
                TypedValue::Array(
                    portico_commons::ArrayValue::new(
                        Rep::String,
                        vec![TypedValue::String("您好".to_string()), TypedValue::Null],
                    )
                    .unwrap(),
                ),
            ]],
        )
    }

    fn all_requests() -> Vec<Request> {
        let mut info = HashMap::new();
        info.insert("user".to_string(), "alice".to_string());
        vec![
            Request::OpenConnection(OpenConnectionRequest {
                connection_id: conn(),
                info,
            }),
            Request::CloseConnection(CloseConnectionRequest {
                connection_id: conn(),
            }),
            Request::ConnectionSync(ConnectionSyncRequest {
                connection_id: conn(),
                conn_props: ConnectionProps {
                    dirty: true,
                    auto_commit: Some(false),
                    read_only: Some(true),
                    transaction_isolation: Some(2),
                    catalog: None,
                    schema: Some("PUBLIC".to_string()),
                },
            }),
            Request::DatabaseProperty(DatabasePropertyRequest {
                connection_id: conn(),
            }),
            Request::GetSchemas(SchemasRequest {
                connection_id: conn(),
                catalog: None,
                schema_pattern: Some("%".to_string()),
            }),
            Request::GetTables(TablesRequest {
                connection_id: conn(),
                catalog: None,
                schema_pattern: None,
                table_name_pattern: Some("EMP%".to_string()),
                type_list: Some(vec!["TABLE".to_string()]),
            }),
            Request::GetColumns(ColumnsRequest {
                connection_id: conn(),
                catalog: None,
                schema_pattern: None,
                table_name_pattern: None,
                column_name_pattern: None,
            }),
            Request::GetTypeInfo(TypeInfoRequest {
                connection_id: conn(),
            }),
            Request::CreateStatement(CreateStatementRequest {
                connection_id: conn(),
            }),
            Request::CloseStatement(CloseStatementRequest {
                connection_id: conn(),
                statement_id: 3,
            }),
            Request::Prepare(PrepareRequest {
                connection_id: conn(),
                sql: "select * from emp where id = ?".to_string(),
                max_rows_total: -1,
            }),
            Request::Execute(ExecuteRequest {
                statement_handle: StatementHandle::new(conn(), 3)
                    .with_signature(sample_signature()),
                parameter_values: vec![TypedValue::Long(7)],
                first_frame_max_size: 100,
            }),
            Request::PrepareAndExecute(PrepareAndExecuteRequest {
                connection_id: conn(),
                statement_id: 4,
                sql: "select 1".to_string(),
                max_rows_total: 0,
                first_frame_max_size: 100,
            }),
            Request::ExecuteBatch(ExecuteBatchRequest {
                connection_id: conn(),
                statement_id: 4,
                parameter_values: vec![vec![TypedValue::Long(1)], vec![TypedValue::Long(2)]],
            }),
            Request::PrepareAndExecuteBatch(PrepareAndExecuteBatchRequest {
                connection_id: conn(),
                statement_id: 4,
                sql_commands: vec!["insert into t values (1)".to_string()],
            }),
            Request::Fetch(FetchRequest {
                connection_id: conn(),
                statement_id: 3,
                offset: 100,
                frame_max_size: 100,
            }),
            Request::SyncResults(SyncResultsRequest {
                connection_id: conn(),
                statement_id: 3,
                state: QueryState::sql("select * from emp"),
                offset: 200,
            }),
            Request::Commit(CommitRequest {
                connection_id: conn(),
            }),
            Request::Rollback(RollbackRequest {
                connection_id: conn(),
            }),
        ]
    }

    fn all_responses() -> Vec<Response> {
        let mut props = HashMap::new();
        props.insert(
            "GATEWAY_VERSION".to_string(),
            TypedValue::String("0.4.0".to_string()),
        );
        vec![
            Response::OpenConnection(OpenConnectionResponse { rpc_metadata: rpc() }),
            Response::CloseConnection(CloseConnectionResponse { rpc_metadata: rpc() }),
            Response::ConnectionSync(ConnectionSyncResponse {
                conn_props: ConnectionProps::default(),
                rpc_metadata: rpc(),
            }),
            Response::DatabaseProperty(DatabasePropertyResponse {
                props,
                rpc_metadata: rpc(),
            }),
            Response::ResultSet(ResultSetResponse {
                connection_id: conn(),
                statement_id: 3,
                own_statement: true,
                signature: Some(sample_signature()),
                first_frame: Some(sample_frame()),
                update_count: ResultSetResponse::NO_UPDATE_COUNT,
                rpc_metadata: rpc(),
            }),
            Response::Execute(ExecuteResponse {
                results: vec![ResultSetResponse {
                    connection_id: conn(),
                    statement_id: 3,
                    own_statement: false,
                    signature: None,
                    first_frame: None,
                    update_count: 5,
                    rpc_metadata: rpc(),
                }],
                missing_statement: false,
                rpc_metadata: rpc(),
            }),
            Response::Prepare(PrepareResponse {
                statement: StatementHandle::new(conn(), 9).with_signature(sample_signature()),
                rpc_metadata: rpc(),
            }),
            Response::Fetch(FetchResponse {
                frame: sample_frame(),
                missing_statement: false,
                missing_results: false,
                rpc_metadata: rpc(),
            }),
            Response::CreateStatement(CreateStatementResponse {
                connection_id: conn(),
                statement_id: 11,
                rpc_metadata: rpc(),
            }),
            Response::CloseStatement(CloseStatementResponse { rpc_metadata: rpc() }),
            Response::ExecuteBatch(ExecuteBatchResponse {
                connection_id: conn(),
                statement_id: 11,
                update_counts: vec![1, 1, 0],
                missing_statement: false,
                rpc_metadata: rpc(),
            }),
            Response::SyncResults(SyncResultsResponse {
                missing_statement: false,
                more_results: true,
                rpc_metadata: rpc(),
            }),
            Response::Commit(CommitResponse { rpc_metadata: rpc() }),
            Response::Rollback(RollbackResponse { rpc_metadata: rpc() }),
            Response::Error(ErrorResponse {
                error_message: "Error while executing SQL \"select 1\": boom".to_string(),
                error_code: -1,
                sql_state: "00000".to_string(),
                severity: ErrorSeverity::Error,
                stack_traces: vec!["outer".to_string(), "inner".to_string()],
                rpc_metadata: rpc(),
            }),
        ]
    }

    #[test]
    fn json_round_trips_every_request_variant() {
        for request in all_requests() {
            let bytes = JsonTranslator.serialize_request(&request).unwrap();
            let parsed = JsonTranslator.parse_request(&bytes).unwrap();
            assert_eq!(parsed, request);
        }
    }

    #[test]
    fn binary_round_trips_every_request_variant() {
        for request in all_requests() {
            let bytes = BinaryTranslator.serialize_request(&request).unwrap();
            let parsed = BinaryTranslator.parse_request(&bytes).unwrap();
            assert_eq!(parsed, request);
        }
    }

    #[test]
    fn json_round_trips_every_response_variant() {
        for response in all_responses() {
            let bytes = JsonTranslator.serialize_response(&response).unwrap();
            let parsed = JsonTranslator.parse_response(&bytes).unwrap();
            assert_eq!(parsed, response);
        }
    }

    #[test]
    fn binary_round_trips_every_response_variant() {
        for response in all_responses() {
            let bytes = BinaryTranslator.serialize_response(&response).unwrap();
            let parsed = BinaryTranslator.parse_response(&bytes).unwrap();
            assert_eq!(parsed, response);
        }
    }

    #[test]
    fn json_garbage_mentions_illegal_character() {
        let garbage: &[u8] = &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let err = JsonTranslator.parse_request(garbage).unwrap_err();
        assert!(err.to_string().contains("Illegal character"), "got: {}", err);
    }

    #[test]
    fn binary_garbage_mentions_invalid_tag() {
        let garbage: &[u8] = &[0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let err = BinaryTranslator.parse_request(garbage).unwrap_err();
        assert!(
            err.to_string().contains("contained an invalid tag"),
            "got: {}",
            err
        );
    }

    #[test]
    fn binary_unknown_class_identifier_is_rejected() {
        let bytes = encode_envelope("portico.rpc.teleport", Vec::new()).unwrap();
        let err = BinaryTranslator.parse_request(&bytes).unwrap_err();
        assert!(err.to_string().contains("portico.rpc.teleport"));
        assert!(err.to_string().contains("contained an invalid tag"));
    }

    #[test]
    fn json_unknown_discriminator_is_rejected() {
        let err = JsonTranslator
            .parse_request(b"{\"request\":\"teleport\"}")
            .unwrap_err();
        assert!(matches!(err, MetaError::Protocol(_)));
    }

    #[test]
    fn content_type_selection_is_symmetric() {
        assert_eq!(
            for_content_type("application/json; charset=utf-8").unwrap().content_type(),
            CONTENT_TYPE_JSON
        );
        assert_eq!(
            for_content_type("application/octet-stream").unwrap().content_type(),
            CONTENT_TYPE_BINARY
        );
        assert!(for_content_type("text/html").is_none());
    }

    #[test]
    fn long_extrema_survive_the_textual_form() {
        let frame = Frame::new(
            0,
            true,
            vec![vec![TypedValue::Long(i64::MIN), TypedValue::Long(i64::MAX)]],
        );
        let response = Response::Fetch(FetchResponse {
            frame: frame.clone(),
            missing_statement: false,
            missing_results: false,
            rpc_metadata: rpc(),
        });
        let bytes = JsonTranslator.serialize_response(&response).unwrap();
        match JsonTranslator.parse_response(&bytes).unwrap() {
            Response::Fetch(parsed) => assert_eq!(parsed.frame, frame),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
