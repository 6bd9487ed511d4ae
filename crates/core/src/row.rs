//! Tabular Rows
//!
//! Row records as they flow between the record snapshot, the tools and the
//! summarization prompts: a mapping of column name to JSON scalar.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record: column name to scalar value.
pub type Row = serde_json::Map<String, Value>;

/// Rows returned by a query, capped at a maximum row count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Returned rows (never more than the configured cap).
    pub rows: Vec<Row>,
    /// Number of rows the query produced before capping.
    pub total_rows: usize,
    /// Whether rows were dropped by the cap.
    pub truncated: bool,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// The only value of a single-row, single-column result (e.g. a COUNT).
    pub fn scalar(&self) -> Option<&Value> {
        match (self.rows.as_slice(), self.columns.as_slice()) {
            ([row], [column]) => row.get(column),
            _ => None,
        }
    }

    /// The first `limit` rows as a JSON array, for prompts.
    pub fn preview(&self, limit: usize) -> Value {
        Value::Array(
            self.rows
                .iter()
                .take(limit)
                .cloned()
                .map(Value::Object)
                .collect(),
        )
    }
}

/// Read a column as text, accepting numbers as well.
pub fn text_field<'a>(row: &'a Row, column: &str) -> Option<std::borrow::Cow<'a, str>> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(std::borrow::Cow::Borrowed(s.trim())),
        Value::Number(n) => Some(std::borrow::Cow::Owned(n.to_string())),
        _ => None,
    }
}

/// Read a column as a number, accepting numeric strings as well.
pub fn number_field(row: &Row, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
