//! HR Copilot
//!
//! Answers natural-language questions about employee records. Each question
//! is classified, routed to a tool, a synthesized read-only query, or a
//! direct conversational completion, checked for quality, and sanitized.
//!
//! - `models` - configuration and answer types
//! - `storage` - configuration file, record providers, the record snapshot
//! - `services` - caches, classifier, synthesizer, direct strategy, orchestrator
//! - `utils` - errors and paths

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

// ── Pipeline ───────────────────────────────────────────────────────────
pub use services::{Orchestrator, QuestionClassifier, QuerySynthesizer};

// ── Models ─────────────────────────────────────────────────────────────
pub use models::answer::{Answer, Strategy};
pub use models::settings::AppConfig;

// ── Storage ────────────────────────────────────────────────────────────
pub use storage::{
    ConfigService, JsonFileProvider, RecordProvider, RecordSnapshot, SnapshotOptions,
    StaticProvider,
};

// ── Errors ─────────────────────────────────────────────────────────────
pub use utils::error::{AppError, AppResult};
