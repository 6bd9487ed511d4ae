use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::{ToolCallResult, ToolError};
use crate::params::{ParamKind, ParamSpec, ToolParams};
use crate::stats::department_profile;
use crate::trait_def::{require, Tool, ToolContext};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::required("department_a", ParamKind::Department, "第一个部门"),
    ParamSpec::required("department_b", ParamKind::SecondDepartment, "第二个部门"),
];

/// Side-by-side profile of two departments.
pub struct CompareDepartmentsTool;

#[async_trait]
impl Tool for CompareDepartmentsTool {
    fn name(&self) -> &str {
        "compare_departments"
    }

    fn description(&self) -> &str {
        "对比两个部门的人数、年龄、学历和性别构成"
    }

    fn parameters(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn triggers(&self) -> &[&'static str] {
        &["对比", "比较", "相比", "区别", "差异"]
    }

    async fn execute(&self, ctx: &ToolContext, params: &ToolParams) -> ToolCallResult<Value> {
        let first = require(params, "department_a")?;
        let second = require(params, "department_b")?;
        if first == second {
            return Err(ToolError::invalid("department_b", "两个部门相同"));
        }

        let mut profiles = Vec::with_capacity(2);
        for department in [first, second] {
            let rows = ctx.rows_in(department);
            if rows.is_empty() {
                return Err(ToolError::not_found(format!("没有找到部门：{}", department)));
            }
            profiles.push(department_profile(department, &rows));
        }

        let difference = profiles[0].headcount as i64 - profiles[1].headcount as i64;
        Ok(json!({
            "departments": profiles,
            "headcount_difference": difference,
        }))
    }
}
