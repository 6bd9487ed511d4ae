//! Question Classification
//!
//! The routing decision made for one question, plus the key normalization
//! shared by every cache that is keyed on question text.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Prefix used by tool labels, e.g. `TOOL:find_employee`.
pub const TOOL_LABEL_PREFIX: &str = "TOOL:";

/// Intent assigned to a question.
///
/// Serialized through its label (`SQL_QUERY`, `TOOL:find_employee`, ...) so
/// persisted caches stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Classification {
    SqlQuery,
    Visualization,
    DataAnalysis,
    HybridQuery,
    GeneralQuery,
    Tool(String),
}

impl Classification {
    /// Fixed labels a model may answer with, in match order.
    pub const FIXED_LABELS: [(&'static str, Classification); 5] = [
        ("SQL_QUERY", Classification::SqlQuery),
        ("VISUALIZATION", Classification::Visualization),
        ("DATA_ANALYSIS", Classification::DataAnalysis),
        ("HYBRID_QUERY", Classification::HybridQuery),
        ("GENERAL_QUERY", Classification::GeneralQuery),
    ];

    pub fn label(&self) -> String {
        match self {
            Classification::SqlQuery => "SQL_QUERY".to_string(),
            Classification::Visualization => "VISUALIZATION".to_string(),
            Classification::DataAnalysis => "DATA_ANALYSIS".to_string(),
            Classification::HybridQuery => "HYBRID_QUERY".to_string(),
            Classification::GeneralQuery => "GENERAL_QUERY".to_string(),
            Classification::Tool(name) => format!("{}{}", TOOL_LABEL_PREFIX, name),
        }
    }

    /// Match a raw model reply against the known labels.
    ///
    /// The reply is trimmed and upper-cased, then searched for a `TOOL:<name>`
    /// naming one of `known_tools`, then for each fixed label by substring.
    /// Returns `None` when nothing is recognized.
    pub fn from_model_reply(reply: &str, known_tools: &[String]) -> Option<Classification> {
        let normalized = reply.trim().to_uppercase();

        if let Some(pos) = normalized.find(TOOL_LABEL_PREFIX) {
            let rest = &normalized[pos + TOOL_LABEL_PREFIX.len()..];
            let candidate: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            if let Some(tool) = known_tools
                .iter()
                .find(|t| t.to_uppercase() == candidate)
            {
                return Some(Classification::Tool(tool.clone()));
            }
        }

        Self::FIXED_LABELS
            .iter()
            .find(|(label, _)| normalized.contains(label))
            .map(|(_, class)| class.clone())
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, Classification::Tool(_))
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<Classification> for String {
    fn from(value: Classification) -> Self {
        value.label()
    }
}

impl TryFrom<String> for Classification {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if let Some(name) = value.strip_prefix(TOOL_LABEL_PREFIX) {
            if name.is_empty() {
                return Err(CoreError::parse("empty tool label"));
            }
            return Ok(Classification::Tool(name.to_string()));
        }
        Self::FIXED_LABELS
            .iter()
            .find(|(label, _)| *label == value)
            .map(|(_, class)| class.clone())
            .ok_or_else(|| CoreError::parse(format!("unknown classification label: {}", value)))
    }
}

/// Normalize a question into a cache key.
///
/// Case-folds, strips punctuation (anything that is neither a word character
/// nor whitespace), collapses whitespace runs to one space and trims.
pub fn normalize_question(question: &str) -> String {
    let stripped: String = question
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
