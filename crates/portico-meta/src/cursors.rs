//! Execution, frame materialization, and cursor paging.

use std::sync::Arc;

use portico_commons::{
    ConnectionId, Frame, MetaError, Result, Signature, StatementKey, TypedValue,
};
use portico_engine::{EngineCursor, ExecuteOutcome};
use portico_protocol::{
    ColumnsRequest, ExecuteBatchRequest, ExecuteBatchResponse, ExecuteRequest, ExecuteResponse,
    FetchRequest, FetchResponse, PrepareAndExecuteBatchRequest, PrepareAndExecuteRequest,
    PrepareRequest, PrepareResponse, ResultSetResponse, SchemasRequest, StatementHandle,
    SyncResultsRequest, SyncResultsResponse, TablesRequest, TypeInfoRequest,
};
use portico_session::{CursorState, RequestContext, StatementEntry, StatementState};

use crate::service::{flush_dirty, MetaService};

/// Batch size used when skipping a cursor forward to a fetch offset.
const SKIP_CHUNK: u64 = 1_000;

/// Batch size used when draining a secondary result set completely.
const DRAIN_CHUNK: usize = 1_000;

fn normalize_row_cap(max_rows_total: i64) -> i64 {
    // Both 0 and -1 arrive as "unbounded" on the plain execute path.
    if max_rows_total <= 0 {
        -1
    } else {
        max_rows_total
    }
}

impl MetaService {
    pub(crate) async fn prepare(
        &self,
        r: PrepareRequest,
        ctx: &RequestContext,
    ) -> Result<PrepareResponse> {
        let _guard = self.enter_delegation(ctx, "prepare").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        let signature = state.conn.prepare(&r.sql).await?;
        let stmt = self.store.create_statement(&r.connection_id);
        stmt.set_prepared(&r.sql, signature.clone(), r.max_rows_total);
        Ok(PrepareResponse {
            statement: StatementHandle::new(r.connection_id, stmt.key().statement_id)
                .with_signature(signature),
            rpc_metadata: self.rpc(),
        })
    }

    pub(crate) async fn execute(
        &self,
        r: ExecuteRequest,
        ctx: &RequestContext,
    ) -> Result<ExecuteResponse> {
        let _guard = self.enter_delegation(ctx, "execute").await?;
        let key = StatementKey::new(
            r.statement_handle.connection_id.clone(),
            r.statement_handle.id,
        );
        let entry = self.store.connection(&key.connection_id)?;
        let Some(stmt) = self.store.try_statement(&key) else {
            return Ok(ExecuteResponse {
                results: Vec::new(),
                missing_statement: true,
                rpc_metadata: self.rpc(),
            });
        };
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;

        let signature = stmt
            .signature()
            .or_else(|| r.statement_handle.signature.clone())
            .ok_or_else(|| {
                MetaError::invalid_input(format!("statement {} has not been prepared", key))
            })?;
        signature.check_parameters(&r.parameter_values)?;
        let sql = stmt.sql().or_else(|| signature.sql.clone()).ok_or_else(|| {
            MetaError::invalid_input(format!("statement {} has no SQL to execute", key))
        })?;

        // Re-executing discards the previous cursor.
        if let Some(mut old) = stmt.release_cursor() {
            if let Err(e) = old.cursor.close().await {
                log::warn!("failed to close cursor {}: {}", key, e);
            }
        }
        stmt.set_state(StatementState::Executing);
        let cap = normalize_row_cap(stmt.max_rows_total());
        let outcomes = match state.conn.execute(&sql, &r.parameter_values, cap).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                stmt.set_state(StatementState::Idle);
                return Err(e);
            }
        };
        let frame_size = self.frame_size(r.first_frame_max_size);
        let results = self
            .outcomes_to_results(&key, &stmt, outcomes, frame_size, false)
            .await?;
        Ok(ExecuteResponse {
            results,
            missing_statement: false,
            rpc_metadata: self.rpc(),
        })
    }

    pub(crate) async fn prepare_and_execute(
        &self,
        r: PrepareAndExecuteRequest,
        ctx: &RequestContext,
    ) -> Result<ExecuteResponse> {
        let _guard = self.enter_delegation(ctx, "prepareAndExecute").await?;
        let key = StatementKey::new(r.connection_id.clone(), r.statement_id);
        let entry = self.store.connection(&key.connection_id)?;
        let Some(stmt) = self.store.try_statement(&key) else {
            return Ok(ExecuteResponse {
                results: Vec::new(),
                missing_statement: true,
                rpc_metadata: self.rpc(),
            });
        };
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;

        if let Some(mut old) = stmt.release_cursor() {
            if let Err(e) = old.cursor.close().await {
                log::warn!("failed to close cursor {}: {}", key, e);
            }
        }
        stmt.set_prepared(
            &r.sql,
            Signature::new(Vec::new(), Vec::new(), Some(r.sql.clone())),
            r.max_rows_total,
        );
        stmt.set_state(StatementState::Executing);
        // The fused path keeps the historical meaning of zero: an empty
        // result with a valid signature. Only -1 is unbounded here.
        let cap = if r.max_rows_total == 0 {
            0
        } else {
            normalize_row_cap(r.max_rows_total)
        };
        let outcomes = match state.conn.execute(&r.sql, &[], cap).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                stmt.set_state(StatementState::Idle);
                return Err(e);
            }
        };
        let frame_size = self.frame_size(r.first_frame_max_size);
        let results = self
            .outcomes_to_results(&key, &stmt, outcomes, frame_size, false)
            .await?;
        Ok(ExecuteResponse {
            results,
            missing_statement: false,
            rpc_metadata: self.rpc(),
        })
    }

    pub(crate) async fn execute_batch(
        &self,
        r: ExecuteBatchRequest,
        ctx: &RequestContext,
    ) -> Result<ExecuteBatchResponse> {
        let _guard = self.enter_delegation(ctx, "executeBatch").await?;
        let key = StatementKey::new(r.connection_id.clone(), r.statement_id);
        let entry = self.store.connection(&key.connection_id)?;
        let Some(stmt) = self.store.try_statement(&key) else {
            return Ok(ExecuteBatchResponse {
                connection_id: r.connection_id,
                statement_id: r.statement_id,
                update_counts: Vec::new(),
                missing_statement: true,
                rpc_metadata: self.rpc(),
            });
        };
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;

        let signature = stmt.signature().ok_or_else(|| {
            MetaError::invalid_input(format!("statement {} has not been prepared", key))
        })?;
        for row in &r.parameter_values {
            signature.check_parameters(row)?;
        }
        let sql = stmt.sql().ok_or_else(|| {
            MetaError::invalid_input(format!("statement {} has no SQL to execute", key))
        })?;
        let update_counts = state.conn.execute_batch(&sql, &r.parameter_values).await?;
        Ok(ExecuteBatchResponse {
            connection_id: r.connection_id,
            statement_id: r.statement_id,
            update_counts,
            missing_statement: false,
            rpc_metadata: self.rpc(),
        })
    }

    pub(crate) async fn prepare_and_execute_batch(
        &self,
        r: PrepareAndExecuteBatchRequest,
        ctx: &RequestContext,
    ) -> Result<ExecuteBatchResponse> {
        let _guard = self.enter_delegation(ctx, "prepareAndExecuteBatch").await?;
        let key = StatementKey::new(r.connection_id.clone(), r.statement_id);
        let entry = self.store.connection(&key.connection_id)?;
        if self.store.try_statement(&key).is_none() {
            return Ok(ExecuteBatchResponse {
                connection_id: r.connection_id,
                statement_id: r.statement_id,
                update_counts: Vec::new(),
                missing_statement: true,
                rpc_metadata: self.rpc(),
            });
        }
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        let update_counts = state.conn.execute_sql_batch(&r.sql_commands).await?;
        Ok(ExecuteBatchResponse {
            connection_id: r.connection_id,
            statement_id: r.statement_id,
            update_counts,
            missing_statement: false,
            rpc_metadata: self.rpc(),
        })
    }

    /// Advances the retained cursor. Cursors are forward-only: an offset
    /// behind the current position fails, an offset ahead is reached by
    /// reading and discarding. The cursor is released the moment `done`
    /// turns true.
    pub(crate) async fn fetch(&self, r: FetchRequest, ctx: &RequestContext) -> Result<FetchResponse> {
        let _guard = self.enter_delegation(ctx, "fetch").await?;
        let key = StatementKey::new(r.connection_id.clone(), r.statement_id);
        let entry = self.store.connection(&r.connection_id)?;
        let Some(stmt) = self.store.try_statement(&key) else {
            return Ok(FetchResponse {
                frame: Frame::empty(r.offset, true),
                missing_statement: true,
                missing_results: false,
                rpc_metadata: self.rpc(),
            });
        };
        let _state = entry.lock().await;

        if stmt.is_canceled() {
            return self.deliver_cancellation(&stmt).await;
        }
        let Some(mut cursor_state) = stmt.take_cursor() else {
            return Ok(FetchResponse {
                frame: Frame::empty(r.offset, true),
                missing_statement: false,
                missing_results: true,
                rpc_metadata: self.rpc(),
            });
        };

        if r.offset < cursor_state.position {
            let position = cursor_state.position;
            stmt.put_cursor(cursor_state);
            return Err(MetaError::OffsetOutOfRange {
                requested: r.offset,
                position,
            });
        }

        while cursor_state.position < r.offset {
            if stmt.is_canceled() {
                let _ = cursor_state.cursor.close().await;
                return self.deliver_cancellation(&stmt).await;
            }
            let gap = (r.offset - cursor_state.position).min(SKIP_CHUNK) as usize;
            let (skipped, done) = match cursor_state.cursor.next_batch(gap).await {
                Ok(batch) => batch,
                Err(e) => {
                    let _ = cursor_state.cursor.close().await;
                    stmt.set_state(StatementState::Idle);
                    return Err(e);
                }
            };
            cursor_state.position += skipped.len() as u64;
            if done {
                if let Err(e) = cursor_state.cursor.close().await {
                    log::warn!("failed to close cursor {}: {}", key, e);
                }
                stmt.set_state(StatementState::Idle);
                return Ok(FetchResponse {
                    frame: Frame::empty(r.offset, true),
                    missing_statement: false,
                    missing_results: false,
                    rpc_metadata: self.rpc(),
                });
            }
            if skipped.is_empty() {
                break;
            }
        }

        let max_rows = self.frame_size(r.frame_max_size);
        let (rows, done) = match cursor_state.cursor.next_batch(max_rows).await {
            Ok(batch) => batch,
            Err(e) => {
                let _ = cursor_state.cursor.close().await;
                stmt.set_state(StatementState::Idle);
                return Err(e);
            }
        };
        if stmt.is_canceled() {
            let _ = cursor_state.cursor.close().await;
            return self.deliver_cancellation(&stmt).await;
        }

        let frame = Frame::new(cursor_state.position, done, rows);
        if let Some(signature) = stmt.signature() {
            frame.check_width(signature.column_count())?;
        }
        cursor_state.position += frame.rows.len() as u64;
        if done {
            if let Err(e) = cursor_state.cursor.close().await {
                log::warn!("failed to close cursor {}: {}", key, e);
            }
            stmt.set_state(StatementState::Idle);
        } else {
            stmt.put_cursor(cursor_state);
        }
        Ok(FetchResponse {
            frame,
            missing_statement: false,
            missing_results: false,
            rpc_metadata: self.rpc(),
        })
    }

    /// Reconciles a client cursor after the server lost it: re-executes
    /// the recorded SQL and skips forward to the client's offset.
    pub(crate) async fn sync_results(
        &self,
        r: SyncResultsRequest,
        ctx: &RequestContext,
    ) -> Result<SyncResultsResponse> {
        let _guard = self.enter_delegation(ctx, "syncResults").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let key = StatementKey::new(r.connection_id.clone(), r.statement_id);
        let Some(stmt) = self.store.try_statement(&key) else {
            return Ok(SyncResultsResponse {
                missing_statement: true,
                more_results: false,
                rpc_metadata: self.rpc(),
            });
        };
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;

        if stmt.has_cursor() {
            return Ok(SyncResultsResponse {
                missing_statement: false,
                more_results: true,
                rpc_metadata: self.rpc(),
            });
        }
        let Some(sql) = stmt.sql().or_else(|| r.state.sql.clone()) else {
            return Ok(SyncResultsResponse {
                missing_statement: false,
                more_results: false,
                rpc_metadata: self.rpc(),
            });
        };

        let cap = normalize_row_cap(stmt.max_rows_total());
        let outcomes = state.conn.execute(&sql, &[], cap).await?;
        for outcome in outcomes {
            if let ExecuteOutcome::Rows(mut cursor) = outcome {
                let signature = cursor.signature().clone();
                let mut position = 0u64;
                loop {
                    if position >= r.offset {
                        break;
                    }
                    let gap = (r.offset - position).min(SKIP_CHUNK) as usize;
                    let (skipped, done) = cursor.next_batch(gap).await?;
                    position += skipped.len() as u64;
                    if done {
                        let _ = cursor.close().await;
                        stmt.set_prepared(sql, signature, stmt.max_rows_total());
                        stmt.set_state(StatementState::Idle);
                        return Ok(SyncResultsResponse {
                            missing_statement: false,
                            more_results: false,
                            rpc_metadata: self.rpc(),
                        });
                    }
                    if skipped.is_empty() {
                        break;
                    }
                }
                stmt.set_prepared(sql, signature, stmt.max_rows_total());
                stmt.put_cursor(CursorState { cursor, position });
                return Ok(SyncResultsResponse {
                    missing_statement: false,
                    more_results: true,
                    rpc_metadata: self.rpc(),
                });
            }
        }
        Ok(SyncResultsResponse {
            missing_statement: false,
            more_results: false,
            rpc_metadata: self.rpc(),
        })
    }

    // Catalog queries answer through the same cursor pipeline as query
    // results; large metadata sets page via fetch without eager buffering.

    pub(crate) async fn schemas(
        &self,
        r: SchemasRequest,
        ctx: &RequestContext,
    ) -> Result<ResultSetResponse> {
        let _guard = self.enter_delegation(ctx, "getSchemas").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        let cursor = state
            .conn
            .schemas(r.catalog.as_deref(), r.schema_pattern.as_deref())
            .await?;
        self.catalog_response(&r.connection_id, cursor).await
    }

    pub(crate) async fn tables(
        &self,
        r: TablesRequest,
        ctx: &RequestContext,
    ) -> Result<ResultSetResponse> {
        let _guard = self.enter_delegation(ctx, "getTables").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        let cursor = state
            .conn
            .tables(
                r.catalog.as_deref(),
                r.schema_pattern.as_deref(),
                r.table_name_pattern.as_deref(),
                r.type_list.as_deref(),
            )
            .await?;
        self.catalog_response(&r.connection_id, cursor).await
    }

    pub(crate) async fn columns(
        &self,
        r: ColumnsRequest,
        ctx: &RequestContext,
    ) -> Result<ResultSetResponse> {
        let _guard = self.enter_delegation(ctx, "getColumns").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        let cursor = state
            .conn
            .columns(
                r.catalog.as_deref(),
                r.schema_pattern.as_deref(),
                r.table_name_pattern.as_deref(),
                r.column_name_pattern.as_deref(),
            )
            .await?;
        self.catalog_response(&r.connection_id, cursor).await
    }

    pub(crate) async fn type_info(
        &self,
        r: TypeInfoRequest,
        ctx: &RequestContext,
    ) -> Result<ResultSetResponse> {
        let _guard = self.enter_delegation(ctx, "getTypeInfo").await?;
        let entry = self.store.connection(&r.connection_id)?;
        let mut state = entry.lock().await;
        flush_dirty(&mut state).await?;
        let cursor = state.conn.type_info().await?;
        self.catalog_response(&r.connection_id, cursor).await
    }

    /// Wraps a catalog cursor in a server-allocated statement the client
    /// should close when done paging.
    async fn catalog_response(
        &self,
        connection_id: &ConnectionId,
        cursor: Box<dyn EngineCursor>,
    ) -> Result<ResultSetResponse> {
        let stmt = self.store.create_statement(connection_id);
        let key = stmt.key().clone();
        self.materialize_rows(&key, &stmt, cursor, self.frame_size(0), true)
            .await
    }

    async fn outcomes_to_results(
        &self,
        key: &StatementKey,
        stmt: &Arc<StatementEntry>,
        outcomes: Vec<ExecuteOutcome>,
        first_frame_size: usize,
        own_statement: bool,
    ) -> Result<Vec<ResultSetResponse>> {
        let mut results = Vec::with_capacity(outcomes.len());
        let mut cursor_retained = false;
        for outcome in outcomes {
            match outcome {
                ExecuteOutcome::UpdateCount(count) => {
                    stmt.set_state(StatementState::Idle);
                    results.push(ResultSetResponse {
                        connection_id: key.connection_id.clone(),
                        statement_id: key.statement_id,
                        own_statement,
                        signature: None,
                        first_frame: None,
                        update_count: count,
                        rpc_metadata: self.rpc(),
                    });
                }
                ExecuteOutcome::Rows(cursor) => {
                    if cursor_retained {
                        // One cursor slot per statement: further result
                        // sets are drained into a single complete frame.
                        let (signature, rows) = drain_rows(cursor).await?;
                        let frame = Frame::new(0, true, rows);
                        frame.check_width(signature.column_count())?;
                        results.push(ResultSetResponse {
                            connection_id: key.connection_id.clone(),
                            statement_id: key.statement_id,
                            own_statement,
                            signature: Some(signature),
                            first_frame: Some(frame),
                            update_count: ResultSetResponse::NO_UPDATE_COUNT,
                            rpc_metadata: self.rpc(),
                        });
                    } else {
                        let result = self
                            .materialize_rows(key, stmt, cursor, first_frame_size, own_statement)
                            .await?;
                        cursor_retained = stmt.has_cursor();
                        results.push(result);
                    }
                }
            }
        }
        Ok(results)
    }

    /// Reads the first frame from a fresh cursor. An exhausted cursor is
    /// released before the response is returned; otherwise it is retained
    /// under the statement for later fetches.
    async fn materialize_rows(
        &self,
        key: &StatementKey,
        stmt: &Arc<StatementEntry>,
        mut cursor: Box<dyn EngineCursor>,
        frame_size: usize,
        own_statement: bool,
    ) -> Result<ResultSetResponse> {
        let signature = cursor.signature().clone();
        let (rows, done) = match cursor.next_batch(frame_size).await {
            Ok(batch) => batch,
            Err(e) => {
                let _ = cursor.close().await;
                stmt.set_state(StatementState::Idle);
                return Err(e);
            }
        };
        let frame = Frame::new(0, done, rows);
        frame.check_width(signature.column_count())?;
        stmt.set_signature(signature.clone());
        if done {
            if let Err(e) = cursor.close().await {
                log::warn!("failed to close cursor {}: {}", key, e);
            }
            stmt.set_state(StatementState::Idle);
        } else {
            stmt.put_cursor(CursorState {
                cursor,
                position: frame.rows.len() as u64,
            });
        }
        Ok(ResultSetResponse {
            connection_id: key.connection_id.clone(),
            statement_id: key.statement_id,
            own_statement,
            signature: Some(signature),
            first_frame: Some(frame),
            update_count: ResultSetResponse::NO_UPDATE_COUNT,
            rpc_metadata: self.rpc(),
        })
    }

    /// Delivers the cancellation error at a row boundary and resets the
    /// statement so it can be reused or closed explicitly.
    async fn deliver_cancellation(&self, stmt: &Arc<StatementEntry>) -> Result<FetchResponse> {
        if let Some(mut cursor) = stmt.release_cursor() {
            let _ = cursor.cursor.close().await;
        }
        stmt.clear_canceled();
        stmt.set_state(StatementState::Idle);
        Err(MetaError::StatementCanceled)
    }
}

async fn drain_rows(
    mut cursor: Box<dyn EngineCursor>,
) -> Result<(Signature, Vec<Vec<TypedValue>>)> {
    let signature = cursor.signature().clone();
    let mut rows = Vec::new();
    loop {
        let (batch, done) = cursor.next_batch(DRAIN_CHUNK).await?;
        let empty = batch.is_empty();
        rows.extend(batch);
        if done || empty {
            break;
        }
    }
    let _ = cursor.close().await;
    Ok((signature, rows))
}
