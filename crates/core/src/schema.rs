//! Schema Mapping
//!
//! The canonical column vocabulary of the employee table. Source records may
//! use different key spellings (`education_level`, `dept`, ...); they are
//! resolved against this table once, when a snapshot is built, so prompt
//! building and validation only ever see canonical names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::row::Row;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }

    /// Coerce a source value into this column's storage type.
    ///
    /// Values that cannot be coerced become `null` rather than being stored
    /// with the wrong type.
    pub fn coerce(&self, value: &Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (ColumnType::Text, Value::String(s)) => Value::String(s.trim().to_string()),
            (ColumnType::Text, Value::Number(n)) => Value::String(n.to_string()),
            (ColumnType::Text, Value::Bool(b)) => Value::String(b.to_string()),
            (ColumnType::Integer, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.round() as i64))
                .map(Value::from)
                .unwrap_or(Value::Null),
            (ColumnType::Integer, Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f.round() as i64))
                    .map(Value::from)
                    .unwrap_or(Value::Null)
            }
            (ColumnType::Integer, Value::Bool(b)) => Value::from(i64::from(*b)),
            (ColumnType::Real, Value::Number(n)) => {
                n.as_f64().map(Value::from).unwrap_or(Value::Null)
            }
            (ColumnType::Real, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .map(Value::from)
                .unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }
}

/// One canonical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub description: String,
    /// Alternative source keys that map onto this column.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ColumnDef {
    pub fn new(name: &str, column_type: ColumnType, description: &str, aliases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            description: description.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Canonical table layout plus the alias index built from it.
#[derive(Debug, Clone)]
pub struct SchemaMapping {
    table: String,
    columns: Vec<ColumnDef>,
    relationships: Vec<String>,
    index: HashMap<String, usize>,
}

impl SchemaMapping {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDef>, relationships: Vec<String>) -> Self {
        let mut index = HashMap::new();
        for (i, column) in columns.iter().enumerate() {
            index.insert(column.name.to_lowercase(), i);
            for alias in &column.aliases {
                index.entry(alias.to_lowercase()).or_insert(i);
            }
        }
        Self {
            table: table.into(),
            columns,
            relationships,
            index,
        }
    }

    /// The employee table used by the HR snapshot.
    pub fn employees() -> Self {
        let columns = vec![
            ColumnDef::new("id", ColumnType::Integer, "员工唯一标识", &["employee_id", "emp_id"]),
            ColumnDef::new("name", ColumnType::Text, "员工姓名", &["full_name", "employee_name"]),
            ColumnDef::new("gender", ColumnType::Text, "性别，取值为'男'或'女'", &["sex"]),
            ColumnDef::new("age", ColumnType::Integer, "年龄（周岁）", &[]),
            ColumnDef::new(
                "department",
                ColumnType::Text,
                "所属部门全称，通常以'部'、'所'或'中心'结尾",
                &["dept", "department_name"],
            ),
            ColumnDef::new("position", ColumnType::Text, "职位", &["job", "job_title"]),
            ColumnDef::new("title", ColumnType::Text, "职称", &["professional_title"]),
            ColumnDef::new(
                "education",
                ColumnType::Text,
                "最高学历，如本科、硕士、博士",
                &["education_level", "degree"],
            ),
            ColumnDef::new("university", ColumnType::Text, "毕业院校", &["school", "graduate_school"]),
            ColumnDef::new("major", ColumnType::Text, "所学专业", &["specialty"]),
            ColumnDef::new(
                "hire_date",
                ColumnType::Text,
                "入职日期，格式YYYY-MM-DD",
                &["entry_date", "join_date"],
            ),
            ColumnDef::new("birth_date", ColumnType::Text, "出生日期，格式YYYY-MM-DD", &["birthday"]),
            ColumnDef::new(
                "total_work_years",
                ColumnType::Real,
                "总工作年限（年）",
                &["work_years"],
            ),
            ColumnDef::new(
                "company_years",
                ColumnType::Real,
                "在本公司工作年限（年）",
                &["tenure", "years_in_company"],
            ),
            ColumnDef::new("salary", ColumnType::Real, "月薪（元）", &["monthly_salary"]),
        ];
        let relationships = vec![
            "教育经历（学校、专业、学历）已合并到 employees 表的 university、major、education 字段".to_string(),
            "工作经历已汇总为 employees 表的 total_work_years 与 company_years 字段".to_string(),
        ];
        Self::new("employees", columns, relationships)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn relationships(&self) -> &[String] {
        &self.relationships
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Resolve a source key (canonical name or alias) to its column.
    pub fn resolve(&self, key: &str) -> Option<&ColumnDef> {
        self.index
            .get(&key.trim().to_lowercase())
            .map(|&i| &self.columns[i])
    }

    /// Map a source record onto canonical columns.
    ///
    /// Returns the canonical row and the source keys that had no mapping.
    /// When both a canonical key and an alias are present the canonical key wins.
    pub fn canonicalize(&self, source: &Row) -> (Row, Vec<String>) {
        let mut row = Row::new();
        let mut unknown = Vec::new();
        for (key, value) in source {
            match self.resolve(key) {
                Some(column) => {
                    let is_canonical = key.trim().eq_ignore_ascii_case(&column.name);
                    if is_canonical || !row.contains_key(&column.name) {
                        row.insert(column.name.clone(), column.column_type.coerce(value));
                    }
                }
                None => unknown.push(key.clone()),
            }
        }
        for column in &self.columns {
            row.entry(column.name.clone()).or_insert(Value::Null);
        }
        (row, unknown)
    }

    /// `CREATE TABLE` statement for the canonical table.
    pub fn ddl(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type.sql_type()))
            .collect();
        format!("CREATE TABLE {} ({})", self.table, columns.join(", "))
    }

    /// Human-readable schema block for prompts.
    pub fn describe(&self) -> String {
        let mut out = format!("表名：{}\n字段：\n", self.table);
        for column in &self.columns {
            out.push_str(&format!(
                "- {} ({}): {}\n",
                column.name,
                column.column_type.sql_type(),
                column.description
            ));
        }
        if !self.relationships.is_empty() {
            out.push_str("说明：\n");
            for note in &self.relationships {
                out.push_str(&format!("- {}\n", note));
            }
        }
        out
    }
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self::employees()
    }
}
