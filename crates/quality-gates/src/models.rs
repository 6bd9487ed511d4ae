//! Quality Gate Models
//!
//! Policy tables for the answer quality gate and the response sanitizer.
//! Both are plain data so deployments can tune them from configuration.

use serde::{Deserialize, Serialize};

/// Phrases that mark an answer as a non-answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityPolicy {
    /// Canonical "cannot answer" phrasings, matched ignoring case,
    /// whitespace and punctuation.
    #[serde(default = "default_low_quality_phrases")]
    pub phrases: Vec<String>,
    /// Answers longer than this many characters are treated as substantive
    /// even when they contain one of the phrases.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

pub fn default_low_quality_phrases() -> Vec<String> {
    [
        "抱歉，我无法",
        "我无法回答",
        "无法回答这个问题",
        "我不知道",
        "我不清楚",
        "没有找到相关信息",
        "无法找到相关信息",
        "没有相关数据",
        "无法提供准确",
        "暂时无法提供",
        "处理您的请求时出现了问题",
        "I don't know",
        "I do not know",
        "I cannot answer",
        "I can't answer",
        "I'm not sure",
        "no information available",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_chars() -> usize {
    200
}

impl Default for QualityPolicy {
    fn default() -> Self {
        Self {
            phrases: default_low_quality_phrases(),
            max_chars: default_max_chars(),
        }
    }
}

impl QualityPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.phrases.iter().any(|p| p.trim().is_empty()) {
            return Err("quality phrases must not be empty".to_string());
        }
        if self.max_chars == 0 {
            return Err("quality max_chars must be positive".to_string());
        }
        Ok(())
    }
}

/// Sentences the model uses to narrate its own process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizerPolicy {
    #[serde(default = "default_meta_phrases")]
    pub meta_phrases: Vec<String>,
}

pub fn default_meta_phrases() -> Vec<String> {
    [
        "我将使用以下SQL查询来回答你的问题：",
        "我将使用以下SQL查询来回答您的问题：",
        "以下是我的SQL查询：",
        "我需要使用工具来回答这个问题。",
        "让我使用工具来回答这个问题。",
        "让我查询一下数据库。",
        "I will use the following query:",
        "I'll use the following query:",
        "Here is the SQL query:",
        "Here is my SQL query:",
        "Let me use a tool to answer this question.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for SanitizerPolicy {
    fn default() -> Self {
        Self {
            meta_phrases: default_meta_phrases(),
        }
    }
}

impl SanitizerPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.meta_phrases.iter().any(|p| p.trim().is_empty()) {
            return Err("meta phrases must not be empty".to_string());
        }
        Ok(())
    }
}
