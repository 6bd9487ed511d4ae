//! Record Statistics
//!
//! Grouping and summary helpers shared by the built-in tools. All output is
//! plain serde data so tools can return it as JSON.

use std::collections::HashMap;

use serde::Serialize;

use hr_copilot_core::{number_field, text_field, Row};

use crate::params::Dimension;

/// Label used for rows with no usable value in the grouped column.
pub const UNKNOWN_LABEL: &str = "未知";

const AGE_BANDS: &[&str] = &["20岁以下", "20-29岁", "30-39岁", "40-49岁", "50岁及以上"];
const TENURE_BANDS: &[&str] = &["1年以下", "1-3年", "3-5年", "5-10年", "10年以上"];
const SALARY_BANDS: &[&str] = &["5000以下", "5000-10000", "10000-15000", "15000-20000", "20000以上"];
const BIRTH_MONTHS: &[&str] = &[
    "1月", "2月", "3月", "4月", "5月", "6月", "7月", "8月", "9月", "10月", "11月", "12月",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
    /// Share of the total, in percent, one decimal.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub dimension: String,
    pub total: usize,
    pub buckets: Vec<Bucket>,
}

impl Distribution {
    pub fn count_of(&self, label: &str) -> usize {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map_or(0, |b| b.count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

pub fn age_band(age: f64) -> &'static str {
    match age {
        a if a < 20.0 => AGE_BANDS[0],
        a if a < 30.0 => AGE_BANDS[1],
        a if a < 40.0 => AGE_BANDS[2],
        a if a < 50.0 => AGE_BANDS[3],
        _ => AGE_BANDS[4],
    }
}

pub fn tenure_band(years: f64) -> &'static str {
    match years {
        y if y < 1.0 => TENURE_BANDS[0],
        y if y < 3.0 => TENURE_BANDS[1],
        y if y < 5.0 => TENURE_BANDS[2],
        y if y < 10.0 => TENURE_BANDS[3],
        _ => TENURE_BANDS[4],
    }
}

pub fn salary_band(salary: f64) -> &'static str {
    match salary {
        s if s < 5000.0 => SALARY_BANDS[0],
        s if s < 10000.0 => SALARY_BANDS[1],
        s if s < 15000.0 => SALARY_BANDS[2],
        s if s < 20000.0 => SALARY_BANDS[3],
        _ => SALARY_BANDS[4],
    }
}

/// Month label of a `YYYY-MM-DD` date; `None` when the month is missing or invalid.
pub fn birth_month(date: &str) -> Option<&'static str> {
    let month: usize = date.split(['-', '/']).nth(1)?.trim().parse().ok()?;
    BIRTH_MONTHS.get(month.checked_sub(1)?).copied()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn label_for(row: &Row, dimension: Dimension) -> Option<String> {
    match dimension {
        Dimension::Gender => text_field(row, "gender").map(|v| v.into_owned()),
        Dimension::Education => text_field(row, "education").map(|v| v.into_owned()),
        Dimension::Department => text_field(row, "department").map(|v| v.into_owned()),
        Dimension::Age => number_field(row, "age").map(|a| age_band(a).to_string()),
        Dimension::Tenure => number_field(row, "company_years").map(|y| tenure_band(y).to_string()),
        Dimension::Salary => number_field(row, "salary")
            .filter(|s| *s > 0.0)
            .map(|s| salary_band(s).to_string()),
        Dimension::BirthMonth => {
            text_field(row, "birth_date").and_then(|d| birth_month(&d).map(str::to_string))
        }
    }
}

/// Group `rows` by `dimension`.
///
/// Banded dimensions (age, tenure, salary, birth month) follow band order;
/// other buckets are sorted by count (descending), then label. The unknown
/// bucket always comes last.
pub fn distribution(rows: &[&Row], dimension: Dimension) -> Distribution {
    let band_order: Option<&[&str]> = match dimension {
        Dimension::Age => Some(AGE_BANDS),
        Dimension::Tenure => Some(TENURE_BANDS),
        Dimension::Salary => Some(SALARY_BANDS),
        Dimension::BirthMonth => Some(BIRTH_MONTHS),
        _ => None,
    };
    group(rows, dimension.as_str(), band_order, |row| label_for(row, dimension))
}

/// Group `rows` by the text value of an arbitrary column.
pub fn count_by(rows: &[&Row], column: &str) -> Distribution {
    group(rows, column, None, |row| {
        text_field(row, column).map(|v| v.into_owned())
    })
}

fn group<F>(rows: &[&Row], dimension: &str, band_order: Option<&[&str]>, label: F) -> Distribution
where
    F: Fn(&Row) -> Option<String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let key = label(*row).unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        *counts.entry(key).or_insert(0) += 1;
    }

    let total = rows.len();

    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|(la, ca), (lb, cb)| {
        let unknown = |l: &str| l == UNKNOWN_LABEL;
        unknown(la.as_str()).cmp(&unknown(lb.as_str())).then_with(|| match band_order {
            Some(order) => {
                let pos = |l: &str| order.iter().position(|b| *b == l).unwrap_or(order.len());
                pos(la.as_str()).cmp(&pos(lb.as_str()))
            }
            None => cb.cmp(ca).then_with(|| la.cmp(lb)),
        })
    });

    let buckets = entries
        .into_iter()
        .map(|(label, count)| Bucket {
            percentage: if total == 0 {
                0.0
            } else {
                round1(count as f64 * 100.0 / total as f64)
            },
            label,
            count,
        })
        .collect();

    Distribution {
        dimension: dimension.to_string(),
        total,
        buckets,
    }
}

/// Mean/min/max over the numeric values of `column`; `None` when no row has one.
pub fn numeric_summary(rows: &[&Row], column: &str) -> Option<NumericSummary> {
    let values: Vec<f64> = rows.iter().filter_map(|r| number_field(r, column)).collect();
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(NumericSummary {
        count: values.len(),
        mean: round1(sum / values.len() as f64),
        min,
        max,
    })
}

/// Salary figures over the positive salaries of `rows`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalarySummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Upper middle value for an even count.
    pub median: f64,
}

pub fn salary_summary(rows: &[&Row]) -> Option<SalarySummary> {
    let mut salaries: Vec<f64> = rows
        .iter()
        .filter_map(|r| number_field(r, "salary"))
        .filter(|s| *s > 0.0)
        .collect();
    if salaries.is_empty() {
        return None;
    }
    salaries.sort_by(|a, b| a.total_cmp(b));
    let count = salaries.len();
    Some(SalarySummary {
        count,
        min: salaries[0],
        max: salaries[count - 1],
        mean: round1(salaries.iter().sum::<f64>() / count as f64),
        median: salaries[count / 2],
    })
}

/// Headcount and composition of one department.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentProfile {
    pub department: String,
    pub headcount: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<NumericSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_years: Option<NumericSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalarySummary>,
    pub gender: Distribution,
    pub education: Distribution,
    pub positions: Distribution,
    pub age_bands: Distribution,
    pub tenure_bands: Distribution,
}

pub fn department_profile(department: &str, rows: &[&Row]) -> DepartmentProfile {
    DepartmentProfile {
        department: department.to_string(),
        headcount: rows.len(),
        age: numeric_summary(rows, "age"),
        company_years: numeric_summary(rows, "company_years"),
        salary: salary_summary(rows),
        gender: distribution(rows, Dimension::Gender),
        education: distribution(rows, Dimension::Education),
        positions: count_by(rows, "position"),
        age_bands: distribution(rows, Dimension::Age),
        tenure_bands: distribution(rows, Dimension::Tenure),
    }
}
