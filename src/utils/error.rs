//! Error Handling
//!
//! Unified error type for the question pipeline. The variants mirror the
//! pipeline stages; all of them are converted into a user-facing answer at
//! the orchestrator boundary and never reach the caller.

use std::time::Duration;

use thiserror::Error;

use hr_copilot_llm::LlmError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Model failure while classifying a question
    #[error("Classification error: {0}")]
    Classification(String),

    /// No query could be obtained from the model
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// A query was rejected before execution
    #[error("Query rejected: {0}")]
    Validation(String),

    /// The snapshot rejected a query
    #[error("Execution error: {0}")]
    Execution(String),

    /// A stage exceeded its budget
    #[error("Timeout in {stage} after {millis}ms")]
    Timeout { stage: String, millis: u64 },

    /// Language model errors (auto-converted from LlmError)
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// SQLite errors (auto-converted from rusqlite::Error)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Snapshot lifecycle errors (not initialized, shut down, pool failure)
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Create a query-validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a timeout error for a stage whose `budget` ran out.
    pub fn timeout(stage: impl Into<String>, budget: Duration) -> Self {
        Self::Timeout {
            stage: stage.into(),
            millis: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from the query stages (validation or execution)
    /// and should drive the repair loop.
    pub fn is_query_failure(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Execution(_) | AppError::Sqlite(_)
        )
    }
}

impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
