//! Answer Models
//!
//! What the orchestrator returns for one question.

use serde::{Deserialize, Serialize};

use hr_copilot_core::Classification;

/// Resolution strategy that produced an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Strategy {
    /// A named tool, summarized by the chat tier
    Tool(String),
    /// Synthesized query, executed and summarized
    QuerySynthesis,
    /// Conversational completion over the snapshot overview
    Direct,
    /// Fixed greeting for an empty message
    Greeting,
    /// Served from the answer cache
    Cached,
    /// Fixed apology (error or timeout)
    Apology,
}

impl Strategy {
    pub fn label(&self) -> String {
        match self {
            Strategy::Tool(name) => format!("tool:{}", name),
            Strategy::QuerySynthesis => "query_synthesis".to_string(),
            Strategy::Direct => "direct".to_string(),
            Strategy::Greeting => "greeting".to_string(),
            Strategy::Cached => "cached".to_string(),
            Strategy::Apology => "apology".to_string(),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Final, sanitized answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Whether a second strategy ran after the first was rejected.
    #[serde(default)]
    pub fallback_used: bool,
    #[serde(default)]
    pub from_cache: bool,
}

impl Answer {
    pub fn new(text: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            text: text.into(),
            strategy,
            classification: None,
            fallback_used: false,
            from_cache: false,
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_fallback(mut self, fallback_used: bool) -> Self {
        self.fallback_used = fallback_used;
        self
    }

    /// Whether the answer is one of the fixed apology messages.
    pub fn is_apology(&self) -> bool {
        self.strategy == Strategy::Apology
    }
}
