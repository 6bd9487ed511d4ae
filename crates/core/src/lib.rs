//! HR Copilot Core
//!
//! Foundational value types and errors for the HR Copilot workspace. This
//! crate has no dependency on the model provider, the record store or the
//! async runtime.
//!
//! ## Module Organization
//!
//! - `error` - Core error type (`CoreError`)
//! - `message` - `Message{role, content}` and `Conversation`
//! - `classification` - Routing intents and question-key normalization
//! - `row` - Row records and capped result sets
//! - `schema` - Canonical column vocabulary and source-key mapping
//! - `proxy` - Proxy settings for the model endpoint

pub mod classification;
pub mod error;
pub mod message;
pub mod proxy;
pub mod row;
pub mod schema;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::CoreError;

// ── Conversation ───────────────────────────────────────────────────────
pub use message::{Conversation, Message, MessageRole};

// ── Routing ────────────────────────────────────────────────────────────
pub use classification::{normalize_question, Classification, TOOL_LABEL_PREFIX};

// ── Tabular Data ───────────────────────────────────────────────────────
pub use row::{number_field, text_field, Row, RowSet};
pub use schema::{ColumnDef, ColumnType, SchemaMapping};

// ── Proxy Types ────────────────────────────────────────────────────────
pub use proxy::{ProxyConfig, ProxyProtocol};
