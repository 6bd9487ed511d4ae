//! Tool Trait and Registry
//!
//! A tool is a deterministic capability over the current record snapshot.
//! Tools declare their parameters and trigger phrases; the registry keeps
//! them in registration order, picks one for a question, and folds every
//! outcome (success, failure, missing parameters) into a [`ToolResult`].

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use hr_copilot_core::{text_field, Row};

use crate::error::{ToolCallResult, ToolError};
use crate::executor::ToolResult;
use crate::params::{self, ParamSpec, ToolParams};

// ============================================================================
// Execution Context
// ============================================================================

/// Read-only view of the records a tool runs against, plus the vocabularies
/// (department names, employee names) used for parameter extraction.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    rows: Arc<Vec<Row>>,
    departments: Vec<String>,
    names: Vec<String>,
}

impl ToolContext {
    /// Build a context over `rows`, collecting the distinct department and
    /// employee names they contain.
    pub fn new(rows: Arc<Vec<Row>>) -> Self {
        let distinct = |column: &str| -> Vec<String> {
            rows.iter()
                .filter_map(|row| text_field(row, column).map(|v| v.into_owned()))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };
        let departments = distinct("department");
        let names = distinct("name");
        Self {
            rows,
            departments,
            names,
        }
    }

    /// A context with no records.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Shared handle to the rows.
    pub fn rows_arc(&self) -> Arc<Vec<Row>> {
        self.rows.clone()
    }

    /// Distinct department names, sorted.
    pub fn departments(&self) -> &[String] {
        &self.departments
    }

    /// Distinct employee names, sorted.
    pub fn employee_names(&self) -> &[String] {
        &self.names
    }

    /// Rows whose `department` equals `department`.
    pub fn rows_in(&self, department: &str) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|row| text_field(row, "department").as_deref() == Some(department))
            .collect()
    }
}

// ============================================================================
// Tool Trait
// ============================================================================

/// A named, parameterized capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, also used as the `TOOL:<name>` classification label.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &[ParamSpec];

    /// Phrases that suggest this tool answers the question.
    fn triggers(&self) -> &[&'static str];

    /// Whether the question looks like one this tool answers.
    fn matches_question(&self, question: &str, _ctx: &ToolContext) -> bool {
        self.triggers().iter().any(|t| question.contains(t))
    }

    /// Pull parameter values out of the question. Returns the values found and
    /// the names of required parameters that are missing.
    fn extract_params(&self, question: &str, ctx: &ToolContext) -> (ToolParams, Vec<String>) {
        params::extract_params(self.parameters(), question, ctx)
    }

    /// Run against the context. Required parameters are present when called
    /// through the registry.
    async fn execute(&self, ctx: &ToolContext, params: &ToolParams) -> ToolCallResult<Value>;
}

/// Tool metadata for prompts and listings.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

/// Read a required parameter or fail with `MissingParameter`.
pub fn require<'a>(params: &'a ToolParams, name: &str) -> ToolCallResult<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ToolError::MissingParameter(name.to_string()))
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// Tools by name, iterated in registration order.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. If a tool with the same name already exists, it is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters().to_vec(),
            })
            .collect()
    }

    /// One line per tool (`- name: description`), for classifier prompts.
    pub fn describe(&self) -> String {
        self.iter()
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.order.iter().filter_map(|name| self.tools.get(name))
    }

    /// The first tool, in registration order, that claims the question and
    /// whose required parameters can all be extracted from it.
    pub fn select_for(&self, question: &str, ctx: &ToolContext) -> Option<Arc<dyn Tool>> {
        self.iter()
            .find(|tool| {
                tool.matches_question(question, ctx)
                    && tool.extract_params(question, ctx).1.is_empty()
            })
            .cloned()
    }

    /// Extract parameters for `name` from the question and run it.
    ///
    /// Missing required parameters yield a skipped result without running the
    /// tool; unknown tools and tool errors yield failed results.
    pub async fn dispatch(&self, name: &str, question: &str, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::err(name, ToolParams::new(), ToolError::UnknownTool(name.to_string()).to_string());
        };

        let (params, missing) = tool.extract_params(question, ctx);
        if !missing.is_empty() {
            tracing::debug!(tool = name, missing = ?missing, "tool skipped, parameters not found");
            return ToolResult::skipped(name, params, &missing);
        }

        self.run(tool, params, ctx).await
    }

    /// Run `name` with parameters supplied by the caller (e.g. a model-issued
    /// tool call) instead of extracting them.
    pub async fn dispatch_with(&self, name: &str, params: ToolParams, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::err(name, params, ToolError::UnknownTool(name.to_string()).to_string());
        };

        let missing: Vec<String> = tool
            .parameters()
            .iter()
            .filter(|spec| spec.required && !params.contains_key(spec.name))
            .map(|spec| spec.name.to_string())
            .collect();
        if !missing.is_empty() {
            return ToolResult::skipped(name, params, &missing);
        }

        self.run(tool, params, ctx).await
    }

    async fn run(&self, tool: Arc<dyn Tool>, params: ToolParams, ctx: &ToolContext) -> ToolResult {
        let name = tool.name().to_string();
        match tool.execute(ctx, &params).await {
            Ok(output) => {
                tracing::debug!(tool = %name, "tool completed");
                ToolResult::ok(name, params, output)
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "tool failed");
                ToolResult::err(name, params, e.to_string())
            }
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
