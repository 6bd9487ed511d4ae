//! Rule-Based Queries
//!
//! Last resort when the model produced no usable query even after a
//! clarification: a handful of common question shapes mapped to fixed
//! queries over the canonical table.

use hr_copilot_core::SchemaMapping;
use hr_copilot_tools::params::extract_departments;

const AVERAGE_AGE_WORDS: &[&str] = &["平均年龄", "平均多大", "平均岁数"];
const GENDER_WORDS: &[&str] = &["性别", "男女", "男性", "女性", "男生", "女生", "男员工", "女员工"];
const HEADCOUNT_WORDS: &[&str] = &[
    "多少人", "人数", "几个人", "几人", "多少名", "多少位", "总数", "多少员工", "多少个员工",
];

/// Quote a string literal for SQL.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn contains_any(question: &str, words: &[&str]) -> bool {
    words.iter().any(|w| question.contains(w))
}

/// A query for the question's shape, or `None` when no rule applies.
///
/// Shapes, in order: average age, gender split, headcount. Each is scoped to
/// the first organizational unit named in the question, matched exactly when
/// it is a known department and by substring otherwise.
pub fn rule_based_query(
    question: &str,
    schema: &SchemaMapping,
    known_departments: &[String],
) -> Option<String> {
    let table = schema.table();
    let unit = extract_departments(question, known_departments).into_iter().next();
    let filter = unit.as_deref().map(|unit| {
        if known_departments.iter().any(|d| d == unit) {
            format!(" WHERE department = {}", quote_literal(unit))
        } else {
            format!(" WHERE department LIKE {}", quote_literal(&format!("%{}%", unit)))
        }
    });
    let filter = filter.unwrap_or_default();

    let average_age = contains_any(question, AVERAGE_AGE_WORDS)
        || (question.contains("平均") && question.contains("年龄"));
    if average_age && schema.has_column("age") {
        return Some(format!(
            "SELECT ROUND(AVG(age), 1) AS average_age FROM {}{}",
            table, filter
        ));
    }

    if contains_any(question, GENDER_WORDS) && schema.has_column("gender") {
        return Some(format!(
            "SELECT gender, COUNT(*) AS headcount FROM {}{} GROUP BY gender ORDER BY headcount DESC",
            table, filter
        ));
    }

    if contains_any(question, HEADCOUNT_WORDS) {
        return Some(format!("SELECT COUNT(*) AS headcount FROM {}{}", table, filter));
    }

    None
}
