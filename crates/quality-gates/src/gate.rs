//! Answer Quality Gate
//!
//! Flags "I don't know"-style answers so the orchestrator can try another
//! strategy. The gate only signals; it never edits the answer.

use crate::models::QualityPolicy;

/// Phrase-table quality check.
#[derive(Debug, Clone)]
pub struct QualityGate {
    phrases: Vec<String>,
    max_chars: usize,
}

/// Lowercase and keep only letters and digits, so "抱歉，我无法" and
/// "抱歉 我无法" compare equal.
fn fold(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

impl QualityGate {
    pub fn new(policy: &QualityPolicy) -> Self {
        Self {
            phrases: policy
                .phrases
                .iter()
                .map(|p| fold(p))
                .filter(|p| !p.is_empty())
                .collect(),
            max_chars: policy.max_chars,
        }
    }

    /// Whether `answer` carries no usable information.
    ///
    /// Empty answers are always low quality. Otherwise the answer must be
    /// short (at most `max_chars` characters) and contain a listed phrase.
    pub fn is_low_quality(&self, answer: &str) -> bool {
        let trimmed = answer.trim();
        if trimmed.is_empty() {
            return true;
        }
        if trimmed.chars().count() > self.max_chars {
            return false;
        }
        let folded = fold(trimmed);
        let hit = self.phrases.iter().find(|p| folded.contains(p.as_str()));
        if let Some(phrase) = hit {
            tracing::debug!(phrase = %phrase, "answer flagged as low quality");
            return true;
        }
        false
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(&QualityPolicy::default())
    }
}
