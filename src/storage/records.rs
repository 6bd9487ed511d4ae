//! Record Providers
//!
//! Sources of raw employee records for building a snapshot. Records are
//! returned with their source key spellings; canonicalization happens in the
//! snapshot.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use hr_copilot_core::Row;

use crate::utils::error::{AppError, AppResult};

/// Read access to the record store.
#[async_trait]
pub trait RecordProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_records(&self) -> AppResult<Vec<Row>>;
}

/// Records from a JSON file: an array of objects, or an object whose
/// `records` / `data` field is such an array.
pub struct JsonFileProvider {
    path: PathBuf,
}

impl JsonFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Extract row objects from a parsed records document.
pub fn rows_from_json(value: Value) -> AppResult<Vec<Row>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records").or_else(|| map.remove("data")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AppError::snapshot(
                    "records document must be an array or contain a `records` array",
                ))
            }
        },
        _ => return Err(AppError::snapshot("records document must be a JSON array")),
    };

    let total = items.len();
    let rows: Vec<Row> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();
    if rows.len() < total {
        tracing::warn!(skipped = total - rows.len(), "non-object records skipped");
    }
    Ok(rows)
}

#[async_trait]
impl RecordProvider for JsonFileProvider {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn fetch_records(&self) -> AppResult<Vec<Row>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::snapshot(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let value: Value = serde_json::from_str(&content)?;
        rows_from_json(value)
    }
}

/// Fixed in-memory records; `set_rows` replaces them for the next refresh.
#[derive(Default)]
pub struct StaticProvider {
    rows: Mutex<Vec<Row>>,
}

impl StaticProvider {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Build from a JSON array literal.
    pub fn from_json(value: Value) -> AppResult<Self> {
        Ok(Self::new(rows_from_json(value)?))
    }

    pub fn set_rows(&self, rows: Vec<Row>) {
        *self.rows.lock().unwrap_or_else(|e| e.into_inner()) = rows;
    }
}

#[async_trait]
impl RecordProvider for StaticProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_records(&self) -> AppResult<Vec<Row>> {
        Ok(self.rows.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }
}
