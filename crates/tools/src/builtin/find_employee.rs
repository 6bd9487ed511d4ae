use async_trait::async_trait;
use serde_json::{json, Value};

use hr_copilot_core::{text_field, Row};

use crate::error::{ToolCallResult, ToolError};
use crate::params::{ParamKind, ParamSpec, ToolParams};
use crate::trait_def::{require, Tool, ToolContext};

const PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "name",
    ParamKind::PersonName,
    "员工姓名",
)];

const TRIGGERS: &[&str] = &["谁是", "是谁", "员工信息", "个人信息", "介绍一下", "查找", "找一下"];

/// Look up employees by name.
pub struct FindEmployeeTool;

#[async_trait]
impl Tool for FindEmployeeTool {
    fn name(&self) -> &str {
        "find_employee"
    }

    fn description(&self) -> &str {
        "按姓名查找员工的个人信息（部门、职位、学历、年龄、司龄等）"
    }

    fn parameters(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn triggers(&self) -> &[&'static str] {
        TRIGGERS
    }

    fn matches_question(&self, question: &str, ctx: &ToolContext) -> bool {
        TRIGGERS.iter().any(|t| question.contains(t))
            || ctx
                .employee_names()
                .iter()
                .any(|n| n.chars().count() >= 2 && question.contains(n.as_str()))
    }

    async fn execute(&self, ctx: &ToolContext, params: &ToolParams) -> ToolCallResult<Value> {
        let name = require(params, "name")?;

        let exact: Vec<&Row> = ctx
            .rows()
            .iter()
            .filter(|row| text_field(row, "name").as_deref() == Some(name))
            .collect();
        let matches = if exact.is_empty() {
            ctx.rows()
                .iter()
                .filter(|row| text_field(row, "name").is_some_and(|n| n.contains(name)))
                .collect()
        } else {
            exact
        };

        if matches.is_empty() {
            return Err(ToolError::not_found(format!("未找到名为{}的员工", name)));
        }

        Ok(json!({
            "query": name,
            "count": matches.len(),
            "employees": matches,
        }))
    }
}
