//! HR Copilot LLM
//!
//! Language-model access for the question pipeline:
//! - `provider` - the `LlmProvider` trait and HTTP status mapping
//! - `openai` - OpenAI-compatible chat-completions provider (OpenRouter by default)
//! - `client` - `ModelClient::complete(messages, tier)` with per-tier settings
//! - `retry` - per-attempt timeout and exponential backoff
//! - `testing` - scripted in-process provider for tests

pub mod client;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod testing;
pub mod types;

// Re-export main types
pub use client::ModelClient;
pub use http_client::build_http_client;
pub use openai::{OpenAICompatibleProvider, OPENROUTER_API_URL};
pub use provider::{missing_api_key_error, parse_http_error, LlmProvider};
pub use retry::{with_retry, RetryPolicy};
pub use types::*;
