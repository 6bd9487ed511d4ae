//! LLM Types
//!
//! Request/response types, model tiers and the error taxonomy shared by all
//! providers.

use serde::{Deserialize, Serialize};

use hr_copilot_core::ProxyConfig;

pub use hr_copilot_core::{Message, MessageRole};

// ============================================================================
// Model tiers
// ============================================================================

/// Which part of the pipeline a completion is for.
///
/// Each tier maps to its own model and sampling parameters but shares the
/// same call shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Classifier,
    Chat,
    SqlSynthesis,
    Summarization,
}

impl ModelTier {
    pub const ALL: [ModelTier; 4] = [
        ModelTier::Classifier,
        ModelTier::Chat,
        ModelTier::SqlSynthesis,
        ModelTier::Summarization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Classifier => "classifier",
            ModelTier::Chat => "chat",
            ModelTier::SqlSynthesis => "sql_synthesis",
            ModelTier::Summarization => "summarization",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model and sampling parameters for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSettings {
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts for retryable failures (1 = no retry).
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_retry_count() -> u32 {
    3
}

const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";

impl TierSettings {
    /// Defaults for a tier.
    pub fn for_tier(tier: ModelTier) -> Self {
        let (temperature, max_tokens) = match tier {
            ModelTier::Classifier => (0.1, 10),
            ModelTier::Chat => (0.7, 1024),
            ModelTier::SqlSynthesis => (0.2, 2048),
            ModelTier::Summarization => (0.5, 2048),
        };
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature,
            max_tokens,
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!("temperature {} out of range 0.0-2.0", self.temperature));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be positive".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be positive".to_string());
        }
        if self.retry_count == 0 || self.retry_count > 10 {
            return Err("retry_count must be between 1 and 10".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Provider configuration
// ============================================================================

/// Connection settings for a chat-completions endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key (sent as a bearer token)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint override; providers fall back to their default URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    /// Sent as `HTTP-Referer` for OpenRouter attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    /// Sent as `X-Title` for OpenRouter attribution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_title: Option<String>,
}

/// Per-request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequestOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl From<&TierSettings> for LlmRequestOptions {
    fn from(settings: &TierSettings) -> Self {
        Self {
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A completed response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub usage: UsageStats,
    pub model: String,
}

impl LlmResponse {
    /// Response text, or an empty string when the model returned none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

// ============================================================================
// Errors
// ============================================================================

/// LLM error types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LlmError {
    /// Authentication failed (invalid API key)
    AuthenticationFailed { message: String },
    /// Rate limit exceeded
    RateLimited {
        message: String,
        retry_after: Option<u32>,
    },
    /// Model not found or not available
    ModelNotFound { model: String },
    /// Invalid request (bad parameters)
    InvalidRequest { message: String },
    /// Server error from the provider
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// Network/connection error
    NetworkError { message: String },
    /// The call did not finish within its budget
    Timeout { millis: u64 },
    /// Response parsing error
    ParseError { message: String },
    /// Other error
    Other { message: String },
}

impl LlmError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Client-side rejections (4xx other than 429, bad keys, unknown models,
    /// unparseable bodies) are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. }
                | LlmError::ServerError { .. }
                | LlmError::NetworkError { .. }
                | LlmError::Timeout { .. }
        )
    }

    /// Server-suggested wait before retrying, in seconds.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited {
                retry_after: Some(secs),
                ..
            } => Some(u64::from(*secs)),
            _ => None,
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::AuthenticationFailed { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            LlmError::RateLimited { message, .. } => write!(f, "Rate limited: {}", message),
            LlmError::ModelNotFound { model } => write!(f, "Model not found: {}", model),
            LlmError::InvalidRequest { message } => write!(f, "Invalid request: {}", message),
            LlmError::ServerError { message, status } => {
                if let Some(s) = status {
                    write!(f, "Server error ({}): {}", s, message)
                } else {
                    write!(f, "Server error: {}", message)
                }
            }
            LlmError::NetworkError { message } => write!(f, "Network error: {}", message),
            LlmError::Timeout { millis } => write!(f, "Timed out after {}ms", millis),
            LlmError::ParseError { message } => write!(f, "Parse error: {}", message),
            LlmError::Other { message } => write!(f, "Error: {}", message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
