//! Tool Call Results
//!
//! What the dispatcher hands back to the orchestrator for one tool call:
//! the tool name, the extracted parameters, and either a structured result,
//! an error, or a skip because required parameters were not found.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::ToolParams;

/// Outcome of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Completed,
    Failed,
    /// Required parameters could not be extracted; the tool did not run.
    Skipped,
}

/// Result of a tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    pub params: ToolParams,
    pub status: ToolStatus,
    /// Structured output (if completed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error message (if failed or skipped)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(tool: impl Into<String>, params: ToolParams, output: Value) -> Self {
        Self {
            tool: tool.into(),
            params,
            status: ToolStatus::Completed,
            output: Some(output),
            error: None,
        }
    }

    /// Create an error result
    pub fn err(tool: impl Into<String>, params: ToolParams, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            params,
            status: ToolStatus::Failed,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Create a skipped result listing the missing parameters
    pub fn skipped(tool: impl Into<String>, params: ToolParams, missing: &[String]) -> Self {
        Self {
            tool: tool.into(),
            params,
            status: ToolStatus::Skipped,
            output: None,
            error: Some(format!("missing required parameters: {}", missing.join(", "))),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Completed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == ToolStatus::Skipped
    }

    /// Render for inclusion in a prompt.
    pub fn to_content(&self) -> String {
        let args = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        match (&self.status, &self.output) {
            (ToolStatus::Completed, Some(output)) => format!(
                "工具调用: {}({})\n结果:\n{}",
                self.tool,
                args,
                serde_json::to_string_pretty(output).unwrap_or_else(|_| output.to_string())
            ),
            _ => format!(
                "工具调用: {}({})\n错误: {}",
                self.tool,
                args,
                self.error.as_deref().unwrap_or("未知错误")
            ),
        }
    }
}
