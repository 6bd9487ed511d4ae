use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ToolCallResult, ToolError};
use crate::params::{ParamKind, ParamSpec, ToolParams};
use crate::stats::department_profile;
use crate::trait_def::{require, Tool, ToolContext};

const PARAMS: &[ParamSpec] = &[ParamSpec::required(
    "department",
    ParamKind::Department,
    "部门名称",
)];

/// Headcount and composition of a single department.
pub struct AnalyzeDepartmentTool;

#[async_trait]
impl Tool for AnalyzeDepartmentTool {
    fn name(&self) -> &str {
        "analyze_department"
    }

    fn description(&self) -> &str {
        "分析单个部门的人员构成：人数、性别、学历、年龄段、司龄"
    }

    fn parameters(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn triggers(&self) -> &[&'static str] {
        &["分析", "情况", "概况", "组成", "介绍"]
    }

    async fn execute(&self, ctx: &ToolContext, params: &ToolParams) -> ToolCallResult<Value> {
        let department = require(params, "department")?;
        let rows = ctx.rows_in(department);
        if rows.is_empty() {
            return Err(ToolError::not_found(format!("没有找到部门：{}", department)));
        }
        serde_json::to_value(department_profile(department, &rows))
            .map_err(|e| ToolError::Execution(e.to_string()))
    }
}
