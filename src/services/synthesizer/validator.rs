//! Read-Only Query Validator
//!
//! A synthesized query reaches the snapshot only if it passes every check
//! here. Keyword checks run over the whole text, string literals included,
//! so a literal that happens to spell a forbidden word is rejected as well.

use std::sync::OnceLock;

use regex::Regex;

use crate::utils::error::{AppError, AppResult};

/// Keywords that may never appear in an executed query.
pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "attach", "detach",
    "pragma", "vacuum", "reindex", "replace", "merge", "grant", "revoke", "commit", "rollback",
    "savepoint", "transaction",
];

struct Patterns {
    forbidden: Regex,
    system_table: Regex,
    first_keyword: Regex,
}

fn patterns() -> AppResult<&'static Patterns> {
    static PATTERNS: OnceLock<Option<Patterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(Patterns {
                forbidden: Regex::new(&format!(r"(?i)\b({})\b", FORBIDDEN_KEYWORDS.join("|"))).ok()?,
                system_table: Regex::new(r"(?i)\bsqlite_\w*").ok()?,
                first_keyword: Regex::new(r"^[\s(]*([A-Za-z]+)").ok()?,
            })
        })
        .as_ref()
        .ok_or_else(|| AppError::internal("query validator patterns failed to compile"))
}

/// Check that `query` is a single read-only statement and return it with any
/// trailing separators removed.
pub fn validate_query(query: &str) -> AppResult<String> {
    let patterns = patterns()?;

    let statement = query.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());
    if statement.is_empty() {
        return Err(AppError::validation("empty query"));
    }
    if statement.contains(';') {
        return Err(AppError::validation("multiple statements are not allowed"));
    }
    if let Some(m) = patterns.forbidden.find(statement) {
        return Err(AppError::validation(format!(
            "forbidden keyword: {}",
            m.as_str().to_uppercase()
        )));
    }
    if let Some(m) = patterns.system_table.find(statement) {
        return Err(AppError::validation(format!(
            "system table reference: {}",
            m.as_str()
        )));
    }

    let first = patterns
        .first_keyword
        .captures(statement)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase());
    match first.as_deref() {
        Some("SELECT") | Some("WITH") => Ok(statement.to_string()),
        _ => Err(AppError::validation("query must start with SELECT or WITH")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(query: &str) -> bool {
        matches!(validate_query(query), Err(AppError::Validation(_)))
    }

    #[test]
    fn test_accepts_read_only_queries() {
        assert_eq!(
            validate_query("SELECT COUNT(*) FROM employees;  ").unwrap(),
            "SELECT COUNT(*) FROM employees"
        );
        assert!(validate_query("with d as (select department from employees) select * from d").is_ok());
        assert!(validate_query("(SELECT name FROM employees)").is_ok());
        // column names that merely contain a keyword are fine
        assert!(validate_query("SELECT created_at, updated_by FROM employees").is_ok());
    }

    #[test]
    fn test_rejects_mutation_and_injection() {
        assert!(rejected(""));
        assert!(rejected(" ; "));
        assert!(rejected("DELETE FROM employees"));
        assert!(rejected("SELECT 1; DROP TABLE employees"));
        assert!(rejected("select * from employees where 1=1; update employees set age = 1"));
        assert!(rejected("SELECT name FROM sqlite_master"));
        assert!(rejected("PRAGMA table_info(employees)"));
        assert!(rejected("EXPLAIN SELECT 1"));
        assert!(rejected("WITH x AS (SELECT 1) INSERT INTO employees SELECT * FROM x"));
        assert!(rejected("SELECT Replace(name, 'a', 'b') FROM employees"));
    }

    #[test]
    fn test_error_names_keyword() {
        let err = validate_query("select 1 from employees where exists (delete from x)").unwrap_err();
        assert_eq!(err.to_string(), "Query rejected: forbidden keyword: DELETE");
    }
}
