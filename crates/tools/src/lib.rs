//! HR Copilot Tools
//!
//! Deterministic capabilities over the record snapshot and the parsing of
//! model replies that may ask for them:
//! - `Tool` trait - named, parameterized capability with trigger phrases
//! - `ToolRegistry` - registration-ordered lookup, selection and dispatch
//! - `ToolResult` - completed / failed / skipped outcome of a call
//! - `params` - regex extraction of names, departments and dimensions
//! - `stats` - distributions and department profiles
//! - `builtin` - find_employee, compare_departments, distribution_stats,
//!   analyze_department
//! - `output_parser` - query / tool-call recognition in model output

pub mod builtin;
pub mod error;
pub mod executor;
pub mod output_parser;
pub mod params;
pub mod stats;
pub mod trait_def;

// Re-export core types
pub use builtin::{builtin_registry, DISTRIBUTION_TOOL};
pub use error::{ToolCallResult, ToolError};
pub use executor::{ToolResult, ToolStatus};
pub use output_parser::{parse_model_output, ParsedOutput, ParsedToolCall, Recognized};
pub use params::{Dimension, ParamKind, ParamSpec, ToolParams, KNOWN_UNITS};
pub use trait_def::{Tool, ToolContext, ToolDefinition, ToolRegistry};
