//! In-memory reference engine.
//!
//! Plays the role a real relational engine plays behind the gateway:
//! registered tables answer catalog queries and `select * from` scans,
//! fixture statements map exact SQL text to canned outcomes, and named
//! integer cells with staged deltas give transaction semantics that
//! commit/rollback tests can observe. Every engine call is appended to a
//! journal so tests can assert ordering (property flush before execute,
//! flush before commit).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use portico_commons::{
    ColumnMetaData, ConnectionProps, MetaError, Rep, Result, Signature, TypedValue, GATEWAY_VERSION,
};

use crate::{Engine, EngineConnection, EngineCursor, ExecuteOutcome};

const TEMP_TABLE_PREFIX: &str = "create local temporary table ";

/// A registered shared table: column metadata plus rows.
#[derive(Debug, Clone)]
pub struct MemTable {
    pub columns: Vec<ColumnMetaData>,
    pub rows: Vec<Vec<TypedValue>>,
}

/// Canned outcome for an exact SQL string.
#[derive(Clone)]
pub enum Fixture {
    /// A result set; the signature carries parameter descriptors when the
    /// statement is meant to be prepared with parameters.
    Rows {
        signature: Signature,
        rows: Vec<Vec<TypedValue>>,
    },
    /// A DML statement affecting `count` rows.
    Update(i64),
    /// An execution failure with the given engine-side cause.
    Error(String),
    /// Adds `delta` to the named cell, staged until commit unless
    /// auto-commit is on.
    Adjust { cell: String, delta: i64 },
    /// Single-row read of the named cell's committed value.
    ReadCell(String),
}

struct MemState {
    tables: RwLock<BTreeMap<String, MemTable>>,
    fixtures: RwLock<HashMap<String, Fixture>>,
    cells: RwLock<BTreeMap<String, i64>>,
    journal: Mutex<Vec<String>>,
}

/// The in-memory engine. Cloning shares the underlying state.
#[derive(Clone)]
pub struct MemEngine {
    state: Arc<MemState>,
}

impl Default for MemEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MemState {
                tables: RwLock::new(BTreeMap::new()),
                fixtures: RwLock::new(HashMap::new()),
                cells: RwLock::new(BTreeMap::new()),
                journal: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn register_table(
        &self,
        name: impl Into<String>,
        columns: Vec<ColumnMetaData>,
        rows: Vec<Vec<TypedValue>>,
    ) {
        self.state
            .tables
            .write()
            .insert(name.into().to_lowercase(), MemTable { columns, rows });
    }

    /// Registers a parameterless query fixture.
    pub fn register_query(
        &self,
        sql: impl Into<String>,
        columns: Vec<ColumnMetaData>,
        rows: Vec<Vec<TypedValue>>,
    ) {
        let sql = sql.into();
        let signature = Signature::new(columns, Vec::new(), Some(sql.clone()));
        self.state
            .fixtures
            .write()
            .insert(sql, Fixture::Rows { signature, rows });
    }

    /// Registers a query fixture with an explicit signature (parameters
    /// included).
    pub fn register_prepared(
        &self,
        sql: impl Into<String>,
        signature: Signature,
        rows: Vec<Vec<TypedValue>>,
    ) {
        self.state
            .fixtures
            .write()
            .insert(sql.into(), Fixture::Rows { signature, rows });
    }

    pub fn register_update(&self, sql: impl Into<String>, count: i64) {
        self.state.fixtures.write().insert(sql.into(), Fixture::Update(count));
    }

    pub fn register_error(&self, sql: impl Into<String>, cause: impl Into<String>) {
        self.state
            .fixtures
            .write()
            .insert(sql.into(), Fixture::Error(cause.into()));
    }

    pub fn register_adjust(&self, sql: impl Into<String>, cell: impl Into<String>, delta: i64) {
        self.state.fixtures.write().insert(
            sql.into(),
            Fixture::Adjust {
                cell: cell.into(),
                delta,
            },
        );
    }

    pub fn register_read_cell(&self, sql: impl Into<String>, cell: impl Into<String>) {
        self.state
            .fixtures
            .write()
            .insert(sql.into(), Fixture::ReadCell(cell.into()));
    }

    pub fn set_cell(&self, cell: impl Into<String>, value: i64) {
        self.state.cells.write().insert(cell.into(), value);
    }

    pub fn cell(&self, cell: &str) -> Option<i64> {
        self.state.cells.read().get(cell).copied()
    }

    pub fn journal(&self) -> Vec<String> {
        self.state.journal.lock().clone()
    }

    pub fn clear_journal(&self) {
        self.state.journal.lock().clear();
    }

    fn record(&self, entry: &str) {
        self.state.journal.lock().push(entry.to_string());
    }
}

#[async_trait]
impl Engine for MemEngine {
    async fn connect(&self, _info: &HashMap<String, String>) -> Result<Box<dyn EngineConnection>> {
        self.record("connect");
        Ok(Box::new(MemConnection {
            state: Arc::clone(&self.state),
            auto_commit: true,
            staged: Vec::new(),
            temp_tables: BTreeMap::new(),
            closed: false,
        }))
    }
}

struct MemConnection {
    state: Arc<MemState>,
    auto_commit: bool,
    staged: Vec<(String, i64)>,
    /// Session-local temporary tables, invisible to other connections.
    temp_tables: BTreeMap<String, MemTable>,
    closed: bool,
}

impl MemConnection {
    fn record(&self, entry: &str) {
        self.state.journal.lock().push(entry.to_string());
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(MetaError::engine("connection is closed"))
        } else {
            Ok(())
        }
    }

    fn apply_delta(&self, cell: &str, delta: i64) {
        let mut cells = self.state.cells.write();
        *cells.entry(cell.to_string()).or_insert(0) += delta;
    }

    fn lookup_table(&self, name: &str) -> Option<MemTable> {
        let key = name.to_lowercase();
        if let Some(table) = self.temp_tables.get(&key) {
            return Some(table.clone());
        }
        self.state.tables.read().get(&key).cloned()
    }

    fn scan_target(sql: &str) -> Option<String> {
        let lower = sql.trim().to_lowercase();
        lower
            .strip_prefix("select * from ")
            .map(|rest| rest.trim().trim_end_matches(';').to_string())
    }

    fn temp_table_target(sql: &str) -> Option<String> {
        let lower = sql.trim().to_lowercase();
        let rest = lower.strip_prefix(TEMP_TABLE_PREFIX)?;
        let name: String = rest
            .chars()
            .take_while(|c| !c.is_whitespace() && *c != '(')
            .collect();
        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }

    fn signature_for(&self, sql: &str) -> Result<Signature> {
        if let Some(fixture) = self.state.fixtures.read().get(sql) {
            return match fixture {
                Fixture::Rows { signature, .. } => Ok(signature.clone()),
                Fixture::Update(_) | Fixture::Adjust { .. } => {
                    Ok(Signature::new(Vec::new(), Vec::new(), Some(sql.to_string())))
                }
                Fixture::Error(cause) => Err(MetaError::engine_with_sql(sql, cause.clone())),
                Fixture::ReadCell(cell) => Ok(Signature::new(
                    vec![ColumnMetaData::new(0, cell.clone(), Rep::Long)],
                    Vec::new(),
                    Some(sql.to_string()),
                )),
            };
        }
        if let Some(target) = Self::scan_target(sql) {
            let table = self.lookup_table(&target).ok_or_else(|| {
                MetaError::engine_with_sql(sql, format!("Object '{}' not found", target.to_uppercase()))
            })?;
            let mut signature = Signature::for_columns(table.columns);
            signature.sql = Some(sql.to_string());
            return Ok(signature);
        }
        if Self::temp_table_target(sql).is_some() {
            return Ok(Signature::new(Vec::new(), Vec::new(), Some(sql.to_string())));
        }
        Err(MetaError::engine_with_sql(
            sql,
            "statement not understood by the in-memory engine",
        ))
    }

    fn run(&mut self, sql: &str, max_rows_total: i64) -> Result<Vec<ExecuteOutcome>> {
        let fixture = self.state.fixtures.read().get(sql).cloned();
        if let Some(fixture) = fixture {
            return match fixture {
                Fixture::Rows { signature, rows } => Ok(vec![ExecuteOutcome::Rows(Box::new(
                    MemCursor::with_limit(Arc::clone(&self.state), signature, rows, max_rows_total),
                ))]),
                Fixture::Update(count) => Ok(vec![ExecuteOutcome::UpdateCount(count)]),
                Fixture::Error(cause) => Err(MetaError::engine_with_sql(sql, cause)),
                Fixture::Adjust { cell, delta } => {
                    if self.auto_commit {
                        self.apply_delta(&cell, delta);
                    } else {
                        self.staged.push((cell, delta));
                    }
                    Ok(vec![ExecuteOutcome::UpdateCount(1)])
                }
                Fixture::ReadCell(cell) => {
                    let value = self.state.cells.read().get(&cell).copied().unwrap_or(0);
                    let signature = Signature::new(
                        vec![ColumnMetaData::new(0, cell, Rep::Long)],
                        Vec::new(),
                        Some(sql.to_string()),
                    );
                    Ok(vec![ExecuteOutcome::Rows(Box::new(MemCursor::with_limit(
                        Arc::clone(&self.state),
                        signature,
                        vec![vec![TypedValue::Long(value)]],
                        max_rows_total,
                    )))])
                }
            };
        }
        if let Some(target) = Self::scan_target(sql) {
            let table = self.lookup_table(&target).ok_or_else(|| {
                MetaError::engine_with_sql(sql, format!("Object '{}' not found", target.to_uppercase()))
            })?;
            let mut signature = Signature::for_columns(table.columns.clone());
            signature.sql = Some(sql.to_string());
            return Ok(vec![ExecuteOutcome::Rows(Box::new(MemCursor::with_limit(
                Arc::clone(&self.state),
                signature,
                table.rows,
                max_rows_total,
            )))]);
        }
        if let Some(name) = Self::temp_table_target(sql) {
            self.temp_tables.insert(
                name.clone(),
                MemTable {
                    columns: vec![ColumnMetaData::new(0, "id", Rep::Integer)],
                    rows: Vec::new(),
                },
            );
            return Ok(vec![ExecuteOutcome::UpdateCount(0)]);
        }
        Err(MetaError::engine_with_sql(
            sql,
            "statement not understood by the in-memory engine",
        ))
    }

    fn catalog_cursor(&self, columns: Vec<ColumnMetaData>, rows: Vec<Vec<TypedValue>>) -> Box<dyn EngineCursor> {
        Box::new(MemCursor::with_limit(
            Arc::clone(&self.state),
            Signature::for_columns(columns),
            rows,
            -1,
        ))
    }
}

fn matches_pattern(name: &str, pattern: Option<&str>) -> bool {
    match pattern {
        None | Some("") | Some("%") => true,
        Some(p) if p.contains('%') => {
            let parts: Vec<&str> = p.split('%').collect();
            let mut remainder = name;
            for (i, part) in parts.iter().enumerate() {
                if part.is_empty() {
                    continue;
                }
                match remainder.find(part) {
                    Some(pos) => {
                        if i == 0 && pos != 0 {
                            return false;
                        }
                        remainder = &remainder[pos + part.len()..];
                    }
                    None => return false,
                }
            }
            if let Some(last) = parts.last() {
                if !last.is_empty() && !name.ends_with(last) {
                    return false;
                }
            }
            true
        }
        Some(p) => name.eq_ignore_ascii_case(p),
    }
}

#[async_trait]
impl EngineConnection for MemConnection {
    async fn apply_props(&mut self, props: &ConnectionProps) -> Result<()> {
        self.ensure_open()?;
        self.record("apply_props");
        if let Some(auto_commit) = props.auto_commit {
            self.auto_commit = auto_commit;
        }
        Ok(())
    }

    async fn prepare(&mut self, sql: &str) -> Result<Signature> {
        self.ensure_open()?;
        self.record("prepare");
        self.signature_for(sql)
    }

    async fn execute(
        &mut self,
        sql: &str,
        _params: &[TypedValue],
        max_rows_total: i64,
    ) -> Result<Vec<ExecuteOutcome>> {
        self.ensure_open()?;
        self.record("execute");
        self.run(sql, max_rows_total)
    }

    async fn execute_batch(&mut self, sql: &str, param_rows: &[Vec<TypedValue>]) -> Result<Vec<i64>> {
        self.ensure_open()?;
        self.record("execute_batch");
        let mut counts = Vec::with_capacity(param_rows.len());
        for _ in param_rows {
            let outcomes = self.run(sql, -1)?;
            match outcomes.into_iter().next() {
                Some(ExecuteOutcome::UpdateCount(count)) => counts.push(count),
                _ => {
                    return Err(MetaError::engine_with_sql(
                        sql,
                        "batched statement produced a result set",
                    ))
                }
            }
        }
        Ok(counts)
    }

    async fn execute_sql_batch(&mut self, sql_commands: &[String]) -> Result<Vec<i64>> {
        self.ensure_open()?;
        self.record("execute_batch");
        let mut counts = Vec::with_capacity(sql_commands.len());
        for sql in sql_commands {
            let outcomes = self.run(sql, -1)?;
            match outcomes.into_iter().next() {
                Some(ExecuteOutcome::UpdateCount(count)) => counts.push(count),
                _ => {
                    return Err(MetaError::engine_with_sql(
                        sql,
                        "batched statement produced a result set",
                    ))
                }
            }
        }
        Ok(counts)
    }

    async fn schemas(
        &mut self,
        _catalog: Option<&str>,
        schema_pattern: Option<&str>,
    ) -> Result<Box<dyn EngineCursor>> {
        self.ensure_open()?;
        self.record("schemas");
        let columns = vec![
            ColumnMetaData::new(0, "TABLE_SCHEM", Rep::String),
            ColumnMetaData::new(1, "TABLE_CATALOG", Rep::String),
        ];
        let rows = if matches_pattern("PUBLIC", schema_pattern) {
            vec![vec![TypedValue::String("PUBLIC".to_string()), TypedValue::Null]]
        } else {
            Vec::new()
        };
        Ok(self.catalog_cursor(columns, rows))
    }

    async fn tables(
        &mut self,
        _catalog: Option<&str>,
        _schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        _type_list: Option<&[String]>,
    ) -> Result<Box<dyn EngineCursor>> {
        self.ensure_open()?;
        self.record("tables");
        let columns = vec![
            ColumnMetaData::new(0, "TABLE_CAT", Rep::String),
            ColumnMetaData::new(1, "TABLE_SCHEM", Rep::String),
            ColumnMetaData::new(2, "TABLE_NAME", Rep::String),
            ColumnMetaData::new(3, "TABLE_TYPE", Rep::String),
        ];
        let rows = self
            .state
            .tables
            .read()
            .keys()
            .filter(|name| matches_pattern(name, table_pattern))
            .map(|name| {
                vec![
                    TypedValue::Null,
                    TypedValue::String("PUBLIC".to_string()),
                    TypedValue::String(name.to_uppercase()),
                    TypedValue::String("TABLE".to_string()),
                ]
            })
            .collect();
        Ok(self.catalog_cursor(columns, rows))
    }

    async fn columns(
        &mut self,
        _catalog: Option<&str>,
        _schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        column_pattern: Option<&str>,
    ) -> Result<Box<dyn EngineCursor>> {
        self.ensure_open()?;
        self.record("columns");
        let columns = vec![
            ColumnMetaData::new(0, "TABLE_CAT", Rep::String),
            ColumnMetaData::new(1, "TABLE_SCHEM", Rep::String),
            ColumnMetaData::new(2, "TABLE_NAME", Rep::String),
            ColumnMetaData::new(3, "COLUMN_NAME", Rep::String),
            ColumnMetaData::new(4, "DATA_TYPE", Rep::Integer),
            ColumnMetaData::new(5, "TYPE_NAME", Rep::String),
            ColumnMetaData::new(6, "ORDINAL_POSITION", Rep::Integer),
        ];
        let mut rows = Vec::new();
        for (name, table) in self.state.tables.read().iter() {
            if !matches_pattern(name, table_pattern) {
                continue;
            }
            for column in &table.columns {
                if !matches_pattern(&column.column_name, column_pattern) {
                    continue;
                }
                rows.push(vec![
                    TypedValue::Null,
                    TypedValue::String("PUBLIC".to_string()),
                    TypedValue::String(name.to_uppercase()),
                    TypedValue::String(column.column_name.clone()),
                    TypedValue::Integer(column.type_id),
                    TypedValue::String(column.type_name.clone()),
                    TypedValue::Integer(column.ordinal as i32 + 1),
                ]);
            }
        }
        Ok(self.catalog_cursor(columns, rows))
    }

    async fn type_info(&mut self) -> Result<Box<dyn EngineCursor>> {
        self.ensure_open()?;
        self.record("type_info");
        let columns = vec![
            ColumnMetaData::new(0, "TYPE_NAME", Rep::String),
            ColumnMetaData::new(1, "DATA_TYPE", Rep::Integer),
        ];
        let reps = [
            Rep::Boolean,
            Rep::Byte,
            Rep::Short,
            Rep::Integer,
            Rep::Long,
            Rep::Float,
            Rep::Double,
            Rep::Decimal,
            Rep::String,
            Rep::Bytes,
            Rep::Date,
            Rep::Time,
            Rep::Timestamp,
            Rep::Array,
        ];
        let rows = reps
            .iter()
            .map(|rep| {
                vec![
                    TypedValue::String(rep.sql_type_name().to_string()),
                    TypedValue::Integer(rep.sql_type_id()),
                ]
            })
            .collect();
        Ok(self.catalog_cursor(columns, rows))
    }

    async fn database_props(&mut self) -> Result<HashMap<String, TypedValue>> {
        self.ensure_open()?;
        self.record("database_props");
        let mut props = HashMap::new();
        props.insert(
            "GATEWAY_VERSION".to_string(),
            TypedValue::String(GATEWAY_VERSION.to_string()),
        );
        props.insert(
            "ENGINE_NAME".to_string(),
            TypedValue::String("portico-mem".to_string()),
        );
        props.insert("READ_ONLY".to_string(), TypedValue::Boolean(false));
        Ok(props)
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.record("commit");
        for (cell, delta) in std::mem::take(&mut self.staged) {
            self.apply_delta(&cell, delta);
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.record("rollback");
        self.staged.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.record("close");
        self.closed = true;
        self.staged.clear();
        self.temp_tables.clear();
        Ok(())
    }
}

struct MemCursor {
    state: Arc<MemState>,
    signature: Signature,
    rows: Vec<Vec<TypedValue>>,
    position: usize,
}

impl MemCursor {
    fn with_limit(
        state: Arc<MemState>,
        signature: Signature,
        mut rows: Vec<Vec<TypedValue>>,
        max_rows_total: i64,
    ) -> Self {
        if max_rows_total == 0 {
            rows.clear();
        } else if max_rows_total > 0 && rows.len() as i64 > max_rows_total {
            rows.truncate(max_rows_total as usize);
        }
        Self {
            state,
            signature,
            rows,
            position: 0,
        }
    }
}

#[async_trait]
impl EngineCursor for MemCursor {
    fn signature(&self) -> &Signature {
        &self.signature
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<(Vec<Vec<TypedValue>>, bool)> {
        let end = (self.position + max_rows).min(self.rows.len());
        let batch = self.rows[self.position..end].to_vec();
        self.position = end;
        Ok((batch, self.position >= self.rows.len()))
    }

    async fn close(&mut self) -> Result<()> {
        self.state.journal.lock().push("cursor_close".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_column(name: &str) -> Vec<ColumnMetaData> {
        vec![ColumnMetaData::new(0, name, Rep::Long)]
    }

    async fn first_cursor(outcomes: Vec<ExecuteOutcome>) -> Box<dyn EngineCursor> {
        match outcomes.into_iter().next() {
            Some(ExecuteOutcome::Rows(cursor)) => cursor,
            _ => panic!("expected a result set"),
        }
    }

    #[tokio::test]
    async fn scan_of_registered_table() {
        let engine = MemEngine::new();
        engine.register_table(
            "emp",
            long_column("id"),
            vec![vec![TypedValue::Long(1)], vec![TypedValue::Long(2)]],
        );
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        let outcomes = conn.execute("select * from emp", &[], -1).await.unwrap();
        let mut cursor = first_cursor(outcomes).await;
        let (rows, done) = cursor.next_batch(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(done);
    }

    #[tokio::test]
    async fn registered_error_fixture_fails_execution() {
        let engine = MemEngine::new();
        engine.register_error("select 1/0", "division by zero");
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        let err = conn.execute("select 1/0", &[], -1).await.unwrap_err();
        assert!(err.to_string().contains("division by zero"));
    }

    #[tokio::test]
    async fn unknown_table_error_embeds_sql() {
        let engine = MemEngine::new();
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        let err = conn.execute("select * from buffer", &[], -1).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Error while executing SQL \"select * from buffer\""));
        assert!(msg.contains("Object 'BUFFER' not found"));
    }

    #[tokio::test]
    async fn temporary_tables_are_connection_local() {
        let engine = MemEngine::new();
        let mut first = engine.connect(&HashMap::new()).await.unwrap();
        let mut second = engine.connect(&HashMap::new()).await.unwrap();

        first
            .execute("create local temporary table scratch (id integer)", &[], -1)
            .await
            .unwrap();
        assert!(first.execute("select * from scratch", &[], -1).await.is_ok());
        assert!(second.execute("select * from scratch", &[], -1).await.is_err());
    }

    #[tokio::test]
    async fn staged_deltas_commit_and_rollback() {
        let engine = MemEngine::new();
        engine.set_cell("stock", 0);
        engine.register_adjust("update products set stock = stock + 10", "stock", 10);
        engine.register_adjust("update products set stock = stock - 5", "stock", -5);

        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        let props = ConnectionProps {
            auto_commit: Some(false),
            ..Default::default()
        };
        conn.apply_props(&props).await.unwrap();

        conn.execute("update products set stock = stock + 10", &[], -1).await.unwrap();
        assert_eq!(engine.cell("stock"), Some(0), "staged until commit");
        conn.commit().await.unwrap();
        assert_eq!(engine.cell("stock"), Some(10));

        conn.execute("update products set stock = stock - 5", &[], -1).await.unwrap();
        conn.rollback().await.unwrap();
        assert_eq!(engine.cell("stock"), Some(10), "rolled back delta is discarded");
    }

    #[tokio::test]
    async fn read_cell_fixture_reports_committed_value() {
        let engine = MemEngine::new();
        engine.set_cell("stock", 7);
        engine.register_read_cell("select stock from products", "stock");
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        let outcomes = conn.execute("select stock from products", &[], -1).await.unwrap();
        let mut cursor = first_cursor(outcomes).await;
        let (rows, done) = cursor.next_batch(10).await.unwrap();
        assert_eq!(rows, vec![vec![TypedValue::Long(7)]]);
        assert!(done);
    }

    #[tokio::test]
    async fn auto_commit_applies_immediately() {
        let engine = MemEngine::new();
        engine.register_adjust("bump", "n", 1);
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        conn.execute("bump", &[], -1).await.unwrap();
        assert_eq!(engine.cell("n"), Some(1));
    }

    #[tokio::test]
    async fn zero_row_limit_keeps_signature() {
        let engine = MemEngine::new();
        engine.register_query(
            "select * from big",
            long_column("id"),
            (0..50).map(|i| vec![TypedValue::Long(i)]).collect(),
        );
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        let outcomes = conn.execute("select * from big", &[], 0).await.unwrap();
        let mut cursor = first_cursor(outcomes).await;
        assert_eq!(cursor.signature().column_count(), 1);
        let (rows, done) = cursor.next_batch(10).await.unwrap();
        assert!(rows.is_empty());
        assert!(done);
    }

    #[tokio::test]
    async fn journal_records_call_order() {
        let engine = MemEngine::new();
        engine.register_update("noop", 0);
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        conn.apply_props(&ConnectionProps::default()).await.unwrap();
        conn.execute("noop", &[], -1).await.unwrap();
        conn.commit().await.unwrap();
        assert_eq!(engine.journal(), vec!["connect", "apply_props", "execute", "commit"]);
    }

    #[tokio::test]
    async fn catalog_columns_cover_registered_tables() {
        let engine = MemEngine::new();
        let columns: Vec<ColumnMetaData> = (0..3)
            .map(|i| ColumnMetaData::new(i, format!("c{}", i), Rep::Integer))
            .collect();
        engine.register_table("wide", columns, Vec::new());
        let mut conn = engine.connect(&HashMap::new()).await.unwrap();
        let mut cursor = conn.columns(None, None, None, None).await.unwrap();
        let (rows, done) = cursor.next_batch(100).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(done);
    }
}
