//! Settings Models
//!
//! Application configuration stored in config.json. Every field has a serde
//! default, so a partial (or empty) file is a valid configuration.

use std::path::PathBuf;

use regex::Regex;
use serde::{Deserialize, Serialize};

use hr_copilot_core::ProxyConfig;
use hr_copilot_llm::{ModelTier, ProviderConfig, TierSettings, OPENROUTER_API_URL};
use hr_copilot_quality_gates::{QualityPolicy, SanitizerPolicy};

/// Environment variables read after the file is loaded.
pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_API_URL: &str = "OPENROUTER_API_URL";
pub const ENV_CLASSIFIER_MODEL: &str = "CLASSIFIER_MODEL";
pub const ENV_CHAT_MODEL: &str = "CHAT_MODEL";
pub const ENV_SQL_MODEL: &str = "SQL_MODEL";
pub const ENV_SUMMARY_MODEL: &str = "SUMMARY_MODEL";
pub const ENV_RECORDS: &str = "HR_COPILOT_RECORDS";

/// Application configuration stored in config.json
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub quality: QualityPolicy,
    #[serde(default)]
    pub sanitizer: SanitizerPolicy,
    #[serde(default)]
    pub records: RecordSettings,
}

// ============================================================================
// Model endpoint
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Usually supplied through the environment rather than the file.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    #[serde(default = "default_app_title")]
    pub app_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    #[serde(default)]
    pub tiers: TierTable,
}

fn default_base_url() -> String {
    OPENROUTER_API_URL.to_string()
}

fn default_app_title() -> String {
    "HR Copilot".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            proxy: None,
            app_title: default_app_title(),
            referer: None,
            tiers: TierTable::default(),
        }
    }
}

impl LlmSettings {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key.clone(),
            base_url: Some(self.base_url.clone()),
            proxy: self.proxy.clone(),
            referer: self.referer.clone(),
            app_title: Some(self.app_title.clone()),
        }
    }
}

/// Settings for each model tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    #[serde(default = "classifier_tier")]
    pub classifier: TierSettings,
    #[serde(default = "chat_tier")]
    pub chat: TierSettings,
    #[serde(default = "sql_tier")]
    pub sql_synthesis: TierSettings,
    #[serde(default = "summarization_tier")]
    pub summarization: TierSettings,
}

fn classifier_tier() -> TierSettings {
    TierSettings::for_tier(ModelTier::Classifier)
}

fn chat_tier() -> TierSettings {
    TierSettings::for_tier(ModelTier::Chat)
}

fn sql_tier() -> TierSettings {
    TierSettings::for_tier(ModelTier::SqlSynthesis)
}

fn summarization_tier() -> TierSettings {
    TierSettings::for_tier(ModelTier::Summarization)
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            classifier: classifier_tier(),
            chat: chat_tier(),
            sql_synthesis: sql_tier(),
            summarization: summarization_tier(),
        }
    }
}

impl TierTable {
    pub fn get(&self, tier: ModelTier) -> &TierSettings {
        match tier {
            ModelTier::Classifier => &self.classifier,
            ModelTier::Chat => &self.chat,
            ModelTier::SqlSynthesis => &self.sql_synthesis,
            ModelTier::Summarization => &self.summarization,
        }
    }

    pub fn get_mut(&mut self, tier: ModelTier) -> &mut TierSettings {
        match tier {
            ModelTier::Classifier => &mut self.classifier,
            ModelTier::Chat => &mut self.chat,
            ModelTier::SqlSynthesis => &mut self.sql_synthesis,
            ModelTier::Summarization => &mut self.summarization,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Prior turns included in prompts.
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Row cap applied to every query result.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
    /// Rows shown to the summarization model.
    #[serde(default = "default_summary_rows")]
    pub summary_rows: usize,
    /// Corrected queries requested after a failed execution.
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: u32,
    #[serde(default = "default_strategy_timeout_secs")]
    pub strategy_timeout_secs: u64,
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_history_window() -> usize {
    5
}

fn default_max_rows() -> usize {
    1000
}

fn default_summary_rows() -> usize {
    50
}

fn default_max_repair_attempts() -> u32 {
    1
}

fn default_strategy_timeout_secs() -> u64 {
    45
}

fn default_query_timeout_secs() -> u64 {
    10
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            max_rows: default_max_rows(),
            summary_rows: default_summary_rows(),
            max_repair_attempts: default_max_repair_attempts(),
            strategy_timeout_secs: default_strategy_timeout_secs(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

// ============================================================================
// Caches
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_capacity")]
    pub classification_capacity: usize,
    #[serde(default = "default_capacity")]
    pub answer_capacity: usize,
    #[serde(default = "default_true")]
    pub answer_cache_enabled: bool,
    /// Questions matching any of these patterns are never answer-cached.
    #[serde(default = "default_non_cacheable_patterns")]
    pub non_cacheable_patterns: Vec<String>,
    /// Questions containing any of these words are never answer-cached.
    #[serde(default = "default_relative_time_words")]
    pub relative_time_words: Vec<String>,
    /// Where both caches are saved on shutdown and loaded on startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_dir: Option<PathBuf>,
}

fn default_capacity() -> usize {
    100
}

fn default_true() -> bool {
    true
}

pub fn default_non_cacheable_patterns() -> Vec<String> {
    vec![r"(谁是|关于)\s*[^\s,，。？?!！]+".to_string()]
}

pub fn default_relative_time_words() -> Vec<String> {
    ["今天", "昨天", "本周", "上周", "本月", "上月", "最近"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            classification_capacity: default_capacity(),
            answer_capacity: default_capacity(),
            answer_cache_enabled: true,
            non_cacheable_patterns: default_non_cacheable_patterns(),
            relative_time_words: default_relative_time_words(),
            persist_dir: None,
        }
    }
}

/// Where employee records are read from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// ============================================================================
// Overrides and validation
// ============================================================================

impl AppConfig {
    /// Apply the process environment on top of the loaded file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; blank values are ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get(ENV_API_URL) {
            self.llm.base_url = url;
        }
        let models = [
            (ENV_CLASSIFIER_MODEL, ModelTier::Classifier),
            (ENV_CHAT_MODEL, ModelTier::Chat),
            (ENV_SQL_MODEL, ModelTier::SqlSynthesis),
            (ENV_SUMMARY_MODEL, ModelTier::Summarization),
        ];
        for (var, tier) in models {
            if let Some(model) = get(var) {
                self.llm.tiers.get_mut(tier).model = model;
            }
        }
        if let Some(path) = get(ENV_RECORDS) {
            self.records.path = Some(PathBuf::from(path));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://") {
            return Err(format!("Invalid base_url: {}", self.llm.base_url));
        }
        for tier in ModelTier::ALL {
            self.llm
                .tiers
                .get(tier)
                .validate()
                .map_err(|e| format!("tier {}: {}", tier, e))?;
        }

        let p = &self.pipeline;
        if p.history_window > 50 {
            return Err("history_window cannot exceed 50".to_string());
        }
        if p.max_rows == 0 {
            return Err("max_rows must be positive".to_string());
        }
        if p.summary_rows == 0 || p.summary_rows > p.max_rows {
            return Err("summary_rows must be between 1 and max_rows".to_string());
        }
        if p.max_repair_attempts > 3 {
            return Err("max_repair_attempts cannot exceed 3".to_string());
        }
        if p.strategy_timeout_secs == 0 || p.query_timeout_secs == 0 {
            return Err("timeouts must be positive".to_string());
        }

        if self.cache.classification_capacity < 2 || self.cache.answer_capacity < 2 {
            return Err("cache capacities must be at least 2".to_string());
        }
        for pattern in &self.cache.non_cacheable_patterns {
            Regex::new(pattern).map_err(|e| format!("Invalid non-cacheable pattern {}: {}", pattern, e))?;
        }

        self.quality.validate()?;
        self.sanitizer.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.llm.base_url, OPENROUTER_API_URL);
        assert_eq!(config.llm.tiers.classifier.max_tokens, 10);
        assert_eq!(config.llm.tiers.sql_synthesis.temperature, 0.2);
        assert_eq!(config.pipeline.max_rows, 1000);
        assert_eq!(config.pipeline.max_repair_attempts, 1);
        assert_eq!(config.cache.classification_capacity, 100);
    }

    #[test]
    fn test_partial_file() {
        let config: AppConfig = serde_json::from_str(
            r#"{"pipeline": {"max_rows": 200}, "llm": {"tiers": {"chat": {"model": "m"}}}}"#,
        )
        .unwrap();
        assert_eq!(config.pipeline.max_rows, 200);
        assert_eq!(config.pipeline.history_window, 5);
        assert_eq!(config.llm.tiers.chat.model, "m");
        assert_eq!(config.llm.tiers.chat.max_tokens, 1024);
        assert_eq!(config.llm.tiers.summarization.max_tokens, 2048);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_API_KEY, "sk-test"),
            (ENV_SQL_MODEL, "qwen/qwen-coder"),
            (ENV_RECORDS, "/data/employees.json"),
            (ENV_CHAT_MODEL, "   "),
        ]
        .into_iter()
        .collect();
        let mut config = AppConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.llm.tiers.sql_synthesis.model, "qwen/qwen-coder");
        assert_eq!(config.llm.tiers.chat.model, TierSettings::for_tier(ModelTier::Chat).model);
        assert_eq!(config.records.path, Some(PathBuf::from("/data/employees.json")));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = AppConfig::default();
        config.pipeline.summary_rows = 2000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.cache.non_cacheable_patterns.push("(".to_string());
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.llm.base_url = "ftp://x".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = AppConfig::default();
        config.llm.api_key = Some("secret".to_string());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
