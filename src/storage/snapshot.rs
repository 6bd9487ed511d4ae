//! Record Snapshot
//!
//! Read-only, in-memory SQLite copy of the employee records. A refresh
//! builds a complete new database and swaps it in; readers hold an `Arc` to
//! whichever snapshot was current when they started, so they never observe a
//! partially built one.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;

use hr_copilot_core::{Row, RowSet, SchemaMapping};
use hr_copilot_tools::stats::{count_by, numeric_summary};
use hr_copilot_tools::ToolContext;

use crate::models::settings::PipelineSettings;
use crate::storage::records::RecordProvider;
use crate::utils::error::{AppError, AppResult};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// SQLite VM steps between deadline checks of a running query.
const PROGRESS_STEPS: i32 = 1_000;

/// Limits applied to snapshot queries.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub max_rows: usize,
    pub query_timeout: Duration,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self::from(&PipelineSettings::default())
    }
}

impl From<&PipelineSettings> for SnapshotOptions {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            max_rows: settings.max_rows,
            query_timeout: Duration::from_secs(settings.query_timeout_secs),
        }
    }
}

/// Aggregate figures used in prompts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub headcount: usize,
    /// (department, headcount), largest first.
    pub departments: Vec<(String, usize)>,
    /// (gender, headcount), largest first.
    pub gender: Vec<(String, usize)>,
    pub average_age: Option<f64>,
    pub built_at: DateTime<Utc>,
}

impl SnapshotStats {
    fn compute(rows: &[Row]) -> Self {
        let refs: Vec<&Row> = rows.iter().collect();
        let pairs = |column: &str| -> Vec<(String, usize)> {
            count_by(&refs, column)
                .buckets
                .into_iter()
                .map(|b| (b.label, b.count))
                .collect()
        };
        Self {
            headcount: rows.len(),
            departments: pairs("department"),
            gender: pairs("gender"),
            average_age: numeric_summary(&refs, "age").map(|s| s.mean),
            built_at: Utc::now(),
        }
    }

    /// Company overview block for prompts.
    pub fn overview(&self) -> String {
        let join = |pairs: &[(String, usize)], sep: &str| {
            pairs
                .iter()
                .map(|(label, count)| format!("{}（{}人）", label, count))
                .collect::<Vec<_>>()
                .join(sep)
        };
        let mut out = format!("员工总数：{}人\n", self.headcount);
        out.push_str(&format!(
            "部门（{}个）：{}\n",
            self.departments.len(),
            join(&self.departments, "、")
        ));
        if !self.gender.is_empty() {
            out.push_str(&format!("性别构成：{}\n", join(&self.gender, "，")));
        }
        if let Some(age) = self.average_age {
            out.push_str(&format!("平均年龄：{:.1}岁\n", age));
        }
        out
    }
}

/// One fully built snapshot.
struct SnapshotData {
    pool: DbPool,
    tools: ToolContext,
    stats: SnapshotStats,
}

/// Process-wide record snapshot with `init` / `refresh` / `shutdown`.
pub struct RecordSnapshot {
    provider: Arc<dyn RecordProvider>,
    schema: Arc<SchemaMapping>,
    options: SnapshotOptions,
    current: RwLock<Option<Arc<SnapshotData>>>,
}

impl RecordSnapshot {
    /// Create an unloaded snapshot. Queries fail until `refresh` succeeds.
    pub fn new(provider: Arc<dyn RecordProvider>, options: SnapshotOptions) -> Self {
        Self {
            provider,
            schema: Arc::new(SchemaMapping::employees()),
            options,
            current: RwLock::new(None),
        }
    }

    pub fn with_schema(mut self, schema: SchemaMapping) -> Self {
        self.schema = Arc::new(schema);
        self
    }

    /// Create and load a snapshot.
    pub async fn init(provider: Arc<dyn RecordProvider>, options: SnapshotOptions) -> AppResult<Self> {
        let snapshot = Self::new(provider, options);
        snapshot.refresh().await?;
        Ok(snapshot)
    }

    /// Rebuild from the provider and swap the new snapshot in.
    ///
    /// On failure the previous snapshot stays active. Returns the row count.
    pub async fn refresh(&self) -> AppResult<usize> {
        let source = self.provider.fetch_records().await?;
        let schema = self.schema.clone();
        let query_timeout = self.options.query_timeout;
        let data = tokio::task::spawn_blocking(move || build_snapshot(&schema, source, query_timeout))
            .await
            .map_err(|e| AppError::internal(format!("snapshot build task failed: {}", e)))??;

        let headcount = data.stats.headcount;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(data));
        tracing::info!(
            provider = self.provider.name(),
            rows = headcount,
            "record snapshot refreshed"
        );
        Ok(headcount)
    }

    /// Drop the active snapshot. Later reads fail with `AppError::Snapshot`.
    pub fn shutdown(&self) {
        let previous = self.current.write().unwrap_or_else(|e| e.into_inner()).take();
        if previous.is_some() {
            tracing::info!("record snapshot shut down");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    pub fn schema(&self) -> &SchemaMapping {
        &self.schema
    }

    pub fn max_rows(&self) -> usize {
        self.options.max_rows
    }

    fn current(&self) -> AppResult<Arc<SnapshotData>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| AppError::snapshot("record snapshot is not loaded"))
    }

    /// Canonical rows of the active snapshot.
    pub fn records(&self) -> AppResult<Arc<Vec<Row>>> {
        Ok(self.current()?.tools.rows_arc())
    }

    pub fn stats(&self) -> AppResult<SnapshotStats> {
        Ok(self.current()?.stats.clone())
    }

    /// Tool context over the active snapshot; empty when none is loaded.
    pub fn tool_context(&self) -> ToolContext {
        self.current()
            .map(|data| data.tools.clone())
            .unwrap_or_default()
    }

    /// Run a read-only query, capped at `max_rows`, under the query timeout.
    ///
    /// The deadline is fixed on entry and also enforced by the blocking task:
    /// a query still waiting for the connection at the deadline never starts,
    /// and a running statement is aborted once it passes. Either way the
    /// connection is released for the next query.
    pub async fn run_query(&self, sql: &str) -> AppResult<RowSet> {
        let data = self.current()?;
        let sql = sql.to_string();
        let max_rows = self.options.max_rows;
        let timeout = self.options.query_timeout;
        let deadline = Instant::now() + timeout;

        let task = tokio::task::spawn_blocking(move || {
            let wait = deadline.saturating_duration_since(Instant::now());
            let conn = data.pool.get_timeout(wait).map_err(|e| {
                if Instant::now() >= deadline {
                    AppError::timeout("query", timeout)
                } else {
                    AppError::snapshot(format!("connection unavailable: {}", e))
                }
            })?;
            if Instant::now() >= deadline {
                return Err(AppError::timeout("query", timeout));
            }

            conn.progress_handler(PROGRESS_STEPS, Some(move || Instant::now() >= deadline));
            let result = query_rows(&conn, &sql, max_rows);
            conn.progress_handler(0, None::<fn() -> bool>);
            match result {
                Err(e) if Instant::now() >= deadline => {
                    tracing::debug!(error = %e, "statement aborted at the query deadline");
                    Err(AppError::timeout("query", timeout))
                }
                other => other,
            }
        });

        let result = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(AppError::internal(format!("query task failed: {}", e))),
            Err(_) => Err(AppError::timeout("query", timeout)),
        };
        if let Err(AppError::Timeout { millis, .. }) = &result {
            tracing::warn!(millis, "query timed out");
        }
        result
    }
}

// ============================================================================
// Building
// ============================================================================

fn build_snapshot(
    schema: &SchemaMapping,
    source: Vec<Row>,
    query_timeout: Duration,
) -> AppResult<SnapshotData> {
    let mut rows = Vec::with_capacity(source.len());
    let mut unknown_keys = std::collections::BTreeSet::new();
    for record in &source {
        let (row, unknown) = schema.canonicalize(record);
        unknown_keys.extend(unknown);
        rows.push(row);
    }
    if !unknown_keys.is_empty() {
        tracing::debug!(keys = ?unknown_keys, "unmapped source keys dropped");
    }

    // A single connection that is never recycled: the database lives only as
    // long as that connection.
    let mut builder = Pool::builder()
        .max_size(1)
        .min_idle(Some(1))
        .idle_timeout(None)
        .max_lifetime(None);
    if !query_timeout.is_zero() {
        builder = builder.connection_timeout(query_timeout);
    }
    let pool = builder
        .build(SqliteConnectionManager::memory())
        .map_err(|e| AppError::snapshot(format!("Failed to create connection pool: {}", e)))?;

    {
        let mut conn = pool
            .get()
            .map_err(|e| AppError::snapshot(format!("connection unavailable: {}", e)))?;
        conn.execute_batch(&schema.ddl())?;

        let columns = schema.column_names();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table(),
            columns.join(", "),
            placeholders
        );

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in &rows {
                let values = columns
                    .iter()
                    .map(|c| json_to_sql(row.get(*c).unwrap_or(&Value::Null)));
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()?;
        conn.execute_batch("PRAGMA query_only = ON;")?;
    }

    let stats = SnapshotStats::compute(&rows);
    Ok(SnapshotData {
        pool,
        tools: ToolContext::new(Arc::new(rows)),
        stats,
    })
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

// ============================================================================
// Querying
// ============================================================================

fn query_rows(conn: &Connection, sql: &str, max_rows: usize) -> AppResult<RowSet> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::execution(e.to_string()))?;
    if !stmt.readonly() {
        return Err(AppError::validation("statement is not read-only"));
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut result = stmt
        .query([])
        .map_err(|e| AppError::execution(e.to_string()))?;

    let mut rows = Vec::new();
    let mut total_rows = 0usize;
    while let Some(row) = result.next().map_err(|e| AppError::execution(e.to_string()))? {
        total_rows += 1;
        if rows.len() >= max_rows {
            continue;
        }
        let mut record = Row::new();
        for (i, name) in columns.iter().enumerate() {
            let value = row
                .get_ref(i)
                .map_err(|e| AppError::execution(e.to_string()))?;
            record.insert(name.clone(), sql_to_json(value));
        }
        rows.push(record);
    }

    Ok(RowSet {
        columns,
        truncated: total_rows > rows.len(),
        rows,
        total_rows,
    })
}
