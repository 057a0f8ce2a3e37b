//! Client-side connection, statement, and result-set surfaces.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use portico_commons::{
    ConnectionId, ConnectionProps, Frame, Signature, StatementId, TypedValue,
};
use portico_protocol::{
    CloseConnectionRequest, CloseStatementRequest, ColumnsRequest, CommitRequest,
    ConnectionSyncRequest, CreateStatementRequest, DatabasePropertyRequest, ExecuteRequest,
    FetchRequest, PrepareAndExecuteRequest, PrepareRequest, QueryState, Request, Response,
    ResultSetResponse, RollbackRequest, SchemasRequest, StatementHandle, SyncResultsRequest,
    TablesRequest, TypeInfoRequest,
};

use crate::client::{unexpected, GatewayClient};
use crate::error::{LinkError, Result};

const DEFAULT_FRAME_SIZE: i32 = 100;

/// What a statement execution produced on the client side.
#[derive(Debug)]
pub enum StatementResult {
    ResultSet(RemoteResultSet),
    UpdateCount(i64),
}

/// One logical connection to the gateway.
///
/// Property setters only touch the local mirror and mark it dirty; the
/// mirror is synced to the server right before the next operation, and a
/// clean mirror skips the sync round-trip entirely.
pub struct RemoteConnection {
    client: GatewayClient,
    id: ConnectionId,
    server_address: String,
    local_props: ConnectionProps,
    closed: bool,
}

impl RemoteConnection {
    pub(crate) fn new(client: GatewayClient, id: ConnectionId, server_address: String) -> Self {
        Self {
            client,
            id,
            server_address,
            local_props: ConnectionProps::default(),
            closed: false,
        }
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// `<hostname>:<port>` of the server that opened this connection,
    /// usable for affinity pinning.
    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    pub fn set_auto_commit(&mut self, auto_commit: bool) {
        if self.local_props.auto_commit != Some(auto_commit) {
            self.local_props.auto_commit = Some(auto_commit);
            self.local_props.dirty = true;
        }
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        if self.local_props.read_only != Some(read_only) {
            self.local_props.read_only = Some(read_only);
            self.local_props.dirty = true;
        }
    }

    pub fn set_catalog(&mut self, catalog: impl Into<String>) {
        let catalog = catalog.into();
        if self.local_props.catalog.as_ref() != Some(&catalog) {
            self.local_props.catalog = Some(catalog);
            self.local_props.dirty = true;
        }
    }

    pub fn set_schema(&mut self, schema: impl Into<String>) {
        let schema = schema.into();
        if self.local_props.schema.as_ref() != Some(&schema) {
            self.local_props.schema = Some(schema);
            self.local_props.dirty = true;
        }
    }

    pub fn set_transaction_isolation(&mut self, level: i32) {
        if self.local_props.transaction_isolation != Some(level) {
            self.local_props.transaction_isolation = Some(level);
            self.local_props.dirty = true;
        }
    }

    /// Whether local property changes are still unsynced.
    pub fn is_dirty(&self) -> bool {
        self.local_props.is_dirty()
    }

    /// Pushes the dirty mirror to the server; a clean mirror is a no-op
    /// without a round-trip.
    async fn sync_if_dirty(&mut self) -> Result<()> {
        if !self.local_props.is_dirty() {
            return Ok(());
        }
        let response = self
            .client
            .call(&Request::ConnectionSync(ConnectionSyncRequest {
                connection_id: self.id.clone(),
                conn_props: self.local_props.clone(),
            }))
            .await?;
        match response {
            Response::ConnectionSync(r) => {
                self.local_props = r.conn_props;
                self.local_props.clear_dirty();
                Ok(())
            }
            other => Err(unexpected(&other)),
        }
    }

    pub async fn create_statement(&mut self) -> Result<RemoteStatement> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        let response = self
            .client
            .call(&Request::CreateStatement(CreateStatementRequest {
                connection_id: self.id.clone(),
            }))
            .await?;
        match response {
            Response::CreateStatement(r) => Ok(RemoteStatement::new(
                self.client.clone(),
                self.id.clone(),
                r.statement_id,
                None,
            )),
            other => Err(unexpected(&other)),
        }
    }

    /// Prepares SQL on the server and returns the statement with its
    /// parameter and column signatures attached.
    pub async fn prepare(&mut self, sql: &str) -> Result<RemoteStatement> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        let response = self
            .client
            .call(&Request::Prepare(PrepareRequest {
                connection_id: self.id.clone(),
                sql: sql.to_string(),
                max_rows_total: -1,
            }))
            .await?;
        match response {
            Response::Prepare(r) => Ok(RemoteStatement::new(
                self.client.clone(),
                self.id.clone(),
                r.statement.id,
                r.statement.signature,
            )),
            other => Err(unexpected(&other)),
        }
    }

    /// Convenience: allocates a statement and runs one SQL string on it.
    pub async fn execute_query(&mut self, sql: &str) -> Result<StatementResult> {
        let mut statement = self.create_statement().await?;
        statement.execute_sql(sql).await
    }

    pub async fn database_properties(&mut self) -> Result<HashMap<String, TypedValue>> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        let response = self
            .client
            .call(&Request::DatabaseProperty(DatabasePropertyRequest {
                connection_id: self.id.clone(),
            }))
            .await?;
        match response {
            Response::DatabaseProperty(r) => Ok(r.props),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn get_schemas(
        &mut self,
        catalog: Option<String>,
        schema_pattern: Option<String>,
    ) -> Result<RemoteResultSet> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        let response = self
            .client
            .call(&Request::GetSchemas(SchemasRequest {
                connection_id: self.id.clone(),
                catalog,
                schema_pattern,
            }))
            .await?;
        self.result_set(response)
    }

    pub async fn get_tables(
        &mut self,
        catalog: Option<String>,
        schema_pattern: Option<String>,
        table_name_pattern: Option<String>,
        type_list: Option<Vec<String>>,
    ) -> Result<RemoteResultSet> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        let response = self
            .client
            .call(&Request::GetTables(TablesRequest {
                connection_id: self.id.clone(),
                catalog,
                schema_pattern,
                table_name_pattern,
                type_list,
            }))
            .await?;
        self.result_set(response)
    }

    pub async fn get_columns(
        &mut self,
        catalog: Option<String>,
        schema_pattern: Option<String>,
        table_name_pattern: Option<String>,
        column_name_pattern: Option<String>,
    ) -> Result<RemoteResultSet> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        let response = self
            .client
            .call(&Request::GetColumns(ColumnsRequest {
                connection_id: self.id.clone(),
                catalog,
                schema_pattern,
                table_name_pattern,
                column_name_pattern,
            }))
            .await?;
        self.result_set(response)
    }

    pub async fn get_type_info(&mut self) -> Result<RemoteResultSet> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        let response = self
            .client
            .call(&Request::GetTypeInfo(TypeInfoRequest {
                connection_id: self.id.clone(),
            }))
            .await?;
        self.result_set(response)
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        match self
            .client
            .call(&Request::Commit(CommitRequest {
                connection_id: self.id.clone(),
            }))
            .await?
        {
            Response::Commit(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.sync_if_dirty().await?;
        match self
            .client
            .call(&Request::Rollback(RollbackRequest {
                connection_id: self.id.clone(),
            }))
            .await?
        {
            Response::Rollback(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        match self
            .client
            .call(&Request::CloseConnection(CloseConnectionRequest {
                connection_id: self.id.clone(),
            }))
            .await?
        {
            Response::CloseConnection(_) => {
                self.closed = true;
                Ok(())
            }
            other => Err(unexpected(&other)),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(LinkError::Closed(format!("connection {} is closed", self.id)))
        } else {
            Ok(())
        }
    }

    fn result_set(&self, response: Response) -> Result<RemoteResultSet> {
        match response {
            Response::ResultSet(r) => Ok(RemoteResultSet::from_response(
                self.client.clone(),
                r,
                Arc::new(AtomicBool::new(false)),
            )),
            other => Err(unexpected(&other)),
        }
    }
}

/// One server-side statement as seen by the client.
pub struct RemoteStatement {
    client: GatewayClient,
    connection_id: ConnectionId,
    id: StatementId,
    signature: Option<Signature>,
    cancel_flag: Arc<AtomicBool>,
    closed: bool,
}

impl RemoteStatement {
    fn new(
        client: GatewayClient,
        connection_id: ConnectionId,
        id: StatementId,
        signature: Option<Signature>,
    ) -> Self {
        Self {
            client,
            connection_id,
            id,
            signature,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            closed: false,
        }
    }

    pub fn id(&self) -> StatementId {
        self.id
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Marks the statement canceled. The flag is observed at the next row
    /// boundary of any result set iterating on this statement; it does
    /// not interrupt an in-flight call.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Executes the prepared statement with the given parameter values.
    pub async fn execute(&mut self, parameter_values: Vec<TypedValue>) -> Result<StatementResult> {
        self.ensure_open()?;
        let handle = StatementHandle {
            connection_id: self.connection_id.clone(),
            id: self.id,
            signature: self.signature.clone(),
        };
        let response = self
            .client
            .call(&Request::Execute(ExecuteRequest {
                statement_handle: handle,
                parameter_values,
                first_frame_max_size: DEFAULT_FRAME_SIZE,
            }))
            .await?;
        self.first_result(response)
    }

    /// Fused prepare-and-execute with no total row cap.
    pub async fn execute_sql(&mut self, sql: &str) -> Result<StatementResult> {
        self.execute_sql_with_limit(sql, -1).await
    }

    /// Fused prepare-and-execute with an explicit total row cap. The
    /// driver normalizes "no limit" to `-1` on send; `0` asks the server
    /// for an empty result with a valid signature.
    pub async fn execute_sql_with_limit(
        &mut self,
        sql: &str,
        max_rows_total: i64,
    ) -> Result<StatementResult> {
        self.ensure_open()?;
        let max_rows_total = if max_rows_total < 0 { -1 } else { max_rows_total };
        let response = self
            .client
            .call(&Request::PrepareAndExecute(PrepareAndExecuteRequest {
                connection_id: self.connection_id.clone(),
                statement_id: self.id,
                sql: sql.to_string(),
                max_rows_total,
                first_frame_max_size: DEFAULT_FRAME_SIZE,
            }))
            .await?;
        self.first_result(response)
    }

    /// Idempotent.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        match self
            .client
            .call(&Request::CloseStatement(CloseStatementRequest {
                connection_id: self.connection_id.clone(),
                statement_id: self.id,
            }))
            .await?
        {
            Response::CloseStatement(_) => {
                self.closed = true;
                Ok(())
            }
            other => Err(unexpected(&other)),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(LinkError::Closed(format!("statement {} is closed", self.id)))
        } else {
            Ok(())
        }
    }

    fn first_result(&self, response: Response) -> Result<StatementResult> {
        match response {
            Response::Execute(r) => {
                if r.missing_statement {
                    return Err(LinkError::Closed(format!(
                        "statement {} is gone on the server",
                        self.id
                    )));
                }
                let result = r.results.into_iter().next().ok_or_else(|| {
                    LinkError::UnexpectedResponse("execute returned no results".to_string())
                })?;
                Ok(self.to_statement_result(result))
            }
            other => Err(unexpected(&other)),
        }
    }

    fn to_statement_result(&self, result: ResultSetResponse) -> StatementResult {
        if result.is_update() {
            StatementResult::UpdateCount(result.update_count)
        } else {
            StatementResult::ResultSet(RemoteResultSet::from_response(
                self.client.clone(),
                result,
                Arc::clone(&self.cancel_flag),
            ))
        }
    }
}

/// Client-side cursor over a server-held result set. Frames are fetched
/// transparently as rows drain; the absolute offset is monotonic.
#[derive(Debug)]
pub struct RemoteResultSet {
    client: GatewayClient,
    connection_id: ConnectionId,
    statement_id: StatementId,
    signature: Option<Signature>,
    sql: Option<String>,
    rows: VecDeque<Vec<TypedValue>>,
    /// Absolute offset of the next row to request from the server.
    offset: u64,
    done: bool,
    cancel_flag: Arc<AtomicBool>,
}

impl RemoteResultSet {
    fn from_response(
        client: GatewayClient,
        response: ResultSetResponse,
        cancel_flag: Arc<AtomicBool>,
    ) -> Self {
        let signature = response.signature;
        let sql = signature.as_ref().and_then(|s| s.sql.clone());
        let mut rows = VecDeque::new();
        let mut offset = 0;
        let mut done = true;
        if let Some(frame) = response.first_frame {
            offset = frame.offset + frame.rows.len() as u64;
            done = frame.done;
            rows.extend(frame.rows);
        }
        Self {
            client,
            connection_id: response.connection_id,
            statement_id: response.statement_id,
            signature,
            sql,
            rows,
            offset,
            done,
            cancel_flag,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn statement_id(&self) -> StatementId {
        self.statement_id
    }

    /// The next row, fetching another frame when the buffer drains.
    /// Observes the cancel flag at every row boundary.
    pub async fn next(&mut self) -> Result<Option<Vec<TypedValue>>> {
        if self.cancel_flag.load(Ordering::SeqCst) {
            // Deliver the cancellation once, then let the statement be
            // reused or closed normally.
            self.cancel_flag.store(false, Ordering::SeqCst);
            self.rows.clear();
            self.done = true;
            return Err(LinkError::Canceled);
        }
        if let Some(row) = self.rows.pop_front() {
            return Ok(Some(row));
        }
        if self.done {
            return Ok(None);
        }
        self.fetch_more().await?;
        Ok(self.rows.pop_front())
    }

    /// Drains the remaining rows.
    pub async fn collect_rows(&mut self) -> Result<Vec<Vec<TypedValue>>> {
        let mut all = Vec::new();
        while let Some(row) = self.next().await? {
            all.push(row);
        }
        Ok(all)
    }

    async fn fetch_more(&mut self) -> Result<()> {
        let fetch = self.fetch_frame().await?;
        if fetch.missing_statement {
            return Err(LinkError::Closed(format!(
                "statement {} is gone on the server",
                self.statement_id
            )));
        }
        if fetch.missing_results {
            // The server lost the cursor (eviction or restart):
            // reconcile at our offset and retry once.
            self.sync_results().await?;
            let retried = self.fetch_frame().await?;
            if retried.missing_statement || retried.missing_results {
                return Err(LinkError::Closed(
                    "result set could not be re-established on the server".to_string(),
                ));
            }
            self.absorb(retried.frame);
            return Ok(());
        }
        self.absorb(fetch.frame);
        Ok(())
    }

    async fn fetch_frame(&mut self) -> Result<portico_protocol::FetchResponse> {
        let response = self
            .client
            .call(&Request::Fetch(FetchRequest {
                connection_id: self.connection_id.clone(),
                statement_id: self.statement_id,
                offset: self.offset,
                frame_max_size: DEFAULT_FRAME_SIZE,
            }))
            .await?;
        match response {
            Response::Fetch(f) => Ok(f),
            other => Err(unexpected(&other)),
        }
    }

    async fn sync_results(&mut self) -> Result<()> {
        let response = self
            .client
            .call(&Request::SyncResults(SyncResultsRequest {
                connection_id: self.connection_id.clone(),
                statement_id: self.statement_id,
                state: QueryState {
                    sql: self.sql.clone(),
                    op: None,
                },
                offset: self.offset,
            }))
            .await?;
        match response {
            Response::SyncResults(r) if !r.missing_statement => Ok(()),
            Response::SyncResults(_) => Err(LinkError::Closed(format!(
                "statement {} is gone on the server",
                self.statement_id
            ))),
            other => Err(unexpected(&other)),
        }
    }

    fn absorb(&mut self, frame: Frame) {
        self.offset = frame.offset + frame.rows.len() as u64;
        self.done = frame.done;
        self.rows.extend(frame.rows);
    }
}
