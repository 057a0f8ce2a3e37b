//! Dispatch and connection lifecycle.

use std::sync::Arc;

use portico_commons::{Result, StatementKey};
use portico_engine::Engine;
use portico_protocol::{
    CloseConnectionRequest, CloseConnectionResponse, CloseStatementRequest,
    CloseStatementResponse, CommitRequest, CommitResponse, ConnectionSyncRequest,
    ConnectionSyncResponse, CreateStatementRequest, CreateStatementResponse,
    DatabasePropertyRequest, DatabasePropertyResponse, OpenConnectionRequest,
    OpenConnectionResponse, Request, Response, RollbackRequest, RollbackResponse, RpcMetadata,
};
use portico_session::{
    ConnectionState, DelegationCallback, DelegationContext, RequestContext, SessionStore,
    StatementState,
};

/// Per-frame row cap applied when a request does not name one.
pub const DEFAULT_FRAME_SIZE: i32 = 100;

/// The protocol's server side: stateless between requests except for the
/// session store it owns.
pub struct MetaService {
    engine: Arc<dyn Engine>,
    pub(crate) store: Arc<SessionStore>,
    delegation: Option<Arc<dyn DelegationCallback>>,
    rpc_metadata: RpcMetadata,
    default_frame_size: i32,
}

impl MetaService {
    pub fn new(
        engine: Arc<dyn Engine>,
        store: Arc<SessionStore>,
        server_address: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            store,
            delegation: None,
            rpc_metadata: RpcMetadata::new(server_address),
            default_frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    /// Installs the impersonation callback wrapped around every
    /// data-plane engine operation.
    pub fn with_delegation(mut self, callback: Arc<dyn DelegationCallback>) -> Self {
        self.delegation = Some(callback);
        self
    }

    pub fn with_default_frame_size(mut self, rows: i32) -> Self {
        self.default_frame_size = rows;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn rpc_metadata(&self) -> RpcMetadata {
        self.rpc_metadata.clone()
    }

    pub(crate) fn rpc(&self) -> RpcMetadata {
        self.rpc_metadata.clone()
    }

    pub(crate) fn frame_size(&self, requested: i32) -> usize {
        if requested <= 0 {
            self.default_frame_size as usize
        } else {
            requested as usize
        }
    }

    /// Handles one request, converting any failure into the error
    /// envelope. This is the only entry point the transport uses.
    pub async fn handle(&self, request: Request, ctx: &RequestContext) -> Response {
        match self.dispatch(request, ctx).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("request failed: {}", e);
                Response::error(&e, self.rpc())
            }
        }
    }

    async fn dispatch(&self, request: Request, ctx: &RequestContext) -> Result<Response> {
        match request {
            Request::OpenConnection(r) => {
                self.open_connection(r, ctx).await.map(Response::OpenConnection)
            }
            Request::CloseConnection(r) => {
                self.close_connection(r).await.map(Response::CloseConnection)
            }
            Request::ConnectionSync(r) => {
                self.connection_sync(r).await.map(Response::ConnectionSync)
            }
            Request::DatabaseProperty(r) => {
                self.database_property(r, ctx).await.map(Response::DatabaseProperty)
            }
            Request::GetSchemas(r) => self.schemas(r, ctx).await.map(Response::ResultSet),
            Request::GetTables(r) => self.tables(r, ctx).await.map(Response::ResultSet),
            Request::GetColumns(r) => self.columns(r, ctx).await.map(Response::ResultSet),
            Request::GetTypeInfo(r) => self.type_info(r, ctx).await.map(Response::ResultSet),
            Request::CreateStatement(r) => {
                self.create_statement(r).await.map(Response::CreateStatement)
            }
            Request::CloseStatement(r) => {
                self.close_statement(r).await.map(Response::CloseStatement)
            }
            Request::Prepare(r) => self.prepare(r, ctx).await.map(Response::Prepare),
            Request::Execute(r) => self.execute(r, ctx).await.map(Response::Execute),
            Request::PrepareAndExecute(r) => {
                self.prepare_and_execute(r, ctx).await.map(Response::Execute)
            }
            Request::ExecuteBatch(r) => {
                self.execute_batch(r, ctx).await.map(Response::ExecuteBatch)
            }
            Request::PrepareAndExecuteBatch(r) => self
                .prepare_and_execute_batch(r, ctx)
                .await
                .map(Response::ExecuteBatch),
            Request::Fetch(r) => self.fetch(r, ctx).await.map(Response::Fetch),
            Request::SyncResults(r) => self.sync_results(r, ctx).await.map(Response::SyncResults),
            Request::Commit(r) => self.commit(r, ctx).await.map(Response::Commit),
            Request::Rollback(r) => self.rollback(r, ctx).await.map(Response::Rollback),
        }
    }

    /// Establishes the impersonation context for a data-plane operation.
    /// The returned guard scopes the context to the engine call.
    pub(crate) async fn enter_delegation(
        &self,
        ctx: &RequestContext,
        action: &str,
    ) -> Result<Option<Box<dyn DelegationContext>>> {
        match &self.delegation {
            Some(callback) => {
                let user = ctx.remote_user.as_deref().unwrap_or("anonymous");
                let addr = ctx.remote_addr.as_deref().unwrap_or("unknown");
                let guard = callback.enter(user, addr, action).await?;
                Ok(Some(guard))
            }
            None => Ok(None),
        }
    }

    async fn open_connection(
        &self,
        r: OpenConnectionRequest,
        ctx: &RequestContext,
    ) -> Result<OpenConnectionResponse> {
        let _guard = self.enter_delegation(ctx, "openConnection").await?;
        let conn = self.engine.connect(&r.info).await?;
        let (_, fresh) = self.store.register_connection(&r.connection_id, r.info, conn)?;
        if fresh {
            log::debug!("opened connection {}", r.connection_id);
        }
        Ok(OpenConnectionResponse {
            rpc_metadata: self.rpc(),
        })
    }

    /// Releases the connection and all owned statements. Idempotent: a
    /// second close of the same id is a no-op.
    async fn close_connection(&self, r: CloseConnectionRequest) -> Result<CloseConnectionResponse> {
        if let Some((entry, statements)) = self.store.remove_connection(&r.connection_id) {
            let mut state = entry.lock().await;
            for stmt in statements {
                if let Some(mut cursor) = stmt.release_cursor() {
                    if let Err(e) = cursor.cursor.close().await {
                        log::warn!("failed to close cursor {}: {}", stmt.key(), e);
                    }
                }
                stmt.set_state(StatementState::Closed);
            }
            if let Err(e) = state.conn.close().await {
                // Best-effort: the id is invalidated regardless.
                log::warn!("failed to close connection {}: {}", r.connection_id, e);
            }
            log::debug!("closed connection {}", r.connection_id);
        }
        Ok(CloseConnectionResponse {
            rpc_metadata: self.rpc(),
        })
    }

    /// Merges client-side property changes into the local view. The
    /// engine is not touched here; the dirty bit is flushed by the next
    /// data-plane operation.
    async fn connection_sync(&self, r: ConnectionSyncRequest) -> Result<ConnectionSyncResponse> {
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        state.props.merge(&r.conn_props);
        Ok(ConnectionSyncResponse {
            conn_props: state.props.clone(),
            rpc_metadata: self.rpc(),
        })
    }

    async fn database_property(
        &self,
        r: DatabasePropertyRequest,
        ctx: &RequestContext,
    ) -> Result<DatabasePropertyResponse> {
        let _guard = self.enter_delegation(ctx, "databaseProperty").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        let props = state.conn.database_props().await?;
        Ok(DatabasePropertyResponse {
            props,
            rpc_metadata: self.rpc(),
        })
    }

    async fn create_statement(
        &self,
        r: CreateStatementRequest,
    ) -> Result<CreateStatementResponse> {
        // Existence check only; allocation does not touch the engine.
        let _ = self.store.connection(&r.connection_id)?;
        let stmt = self.store.create_statement(&r.connection_id);
        Ok(CreateStatementResponse {
            connection_id: r.connection_id,
            statement_id: stmt.key().statement_id,
            rpc_metadata: self.rpc(),
        })
    }

    /// Idempotent: closing an unknown or already-closed statement is a
    /// no-op.
    async fn close_statement(&self, r: CloseStatementRequest) -> Result<CloseStatementResponse> {
        let key = StatementKey::new(r.connection_id.clone(), r.statement_id);
        if let Some(stmt) = self.store.remove_statement(&key) {
            if let Ok(entry) = self.store.connection(&r.connection_id) {
                let _state = entry.lock().await;
                if let Some(mut cursor) = stmt.release_cursor() {
                    if let Err(e) = cursor.cursor.close().await {
                        log::warn!("failed to close cursor {}: {}", key, e);
                    }
                }
            }
            stmt.set_state(StatementState::Closed);
        }
        Ok(CloseStatementResponse {
            rpc_metadata: self.rpc(),
        })
    }

    async fn commit(&self, r: CommitRequest, ctx: &RequestContext) -> Result<CommitResponse> {
        let _guard = self.enter_delegation(ctx, "commit").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        // Pending property changes are flushed before the transaction
        // call so the engine commits under the properties the client
        // believes are in effect.
        flush_dirty(&mut state).await?;
        state.conn.commit().await?;
        Ok(CommitResponse {
            rpc_metadata: self.rpc(),
        })
    }

    async fn rollback(&self, r: RollbackRequest, ctx: &RequestContext) -> Result<RollbackResponse> {
        let _guard = self.enter_delegation(ctx, "rollback").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        state.conn.rollback().await?;
        Ok(RollbackResponse {
            rpc_metadata: self.rpc(),
        })
    }

    /// Out-of-band cancellation. Marks the statement's cursor canceled;
    /// the next row fetch observes the flag and fails with the fixed
    /// `Statement canceled` message. The statement itself stays open.
    pub fn cancel_statement(&self, key: &StatementKey) -> Result<()> {
        let stmt = self.store.statement(key)?;
        stmt.cancel();
        if stmt.state() == StatementState::HasCursor {
            stmt.set_state(StatementState::Canceled);
        }
        Ok(())
    }
}

/// Pushes dirty property overrides to the engine, then clears the bit.
/// Every data-plane operation calls this first, absorbing redundant
/// property writes into one engine round-trip.
pub(crate) async fn flush_dirty(state: &mut ConnectionState) -> Result<()> {
    if state.props.is_dirty() {
        let props = state.props.clone();
        state.conn.apply_props(&props).await?;
        state.props.clear_dirty();
    }
    Ok(())
}

impl std::fmt::Debug for MetaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaService")
            .field("server_address", &self.rpc_metadata.server_address)
            .field("default_frame_size", &self.default_frame_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_size_defaults_when_unset() {
        let engine = Arc::new(portico_engine::mem::MemEngine::new());
        let store = Arc::new(SessionStore::new(Default::default()));
        let service = MetaService::new(engine, store, "host:1");
        assert_eq!(service.frame_size(0), DEFAULT_FRAME_SIZE as usize);
        assert_eq!(service.frame_size(-1), DEFAULT_FRAME_SIZE as usize);
        assert_eq!(service.frame_size(7), 7);
    }
}
