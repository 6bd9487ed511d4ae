use async_trait::async_trait;
use serde_json::{json, Value};

use hr_copilot_core::Row;

use crate::error::{ToolCallResult, ToolError};
use crate::params::{Dimension, ParamKind, ParamSpec, ToolParams};
use crate::stats::{distribution, salary_summary};
use crate::trait_def::{Tool, ToolContext};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::optional(
        "dimension",
        ParamKind::Dimension,
        "统计维度：性别、年龄、学历、司龄、薪资、生日月份或部门",
    ),
    ParamSpec::optional("department", ParamKind::Department, "限定的部门（可选）"),
];

/// Distribution of employees over one dimension, company-wide or within a
/// department. Defaults to the department dimension. Salary distributions
/// also carry min/max/mean/median.
pub struct DistributionStatsTool;

#[async_trait]
impl Tool for DistributionStatsTool {
    fn name(&self) -> &str {
        super::DISTRIBUTION_TOOL
    }

    fn description(&self) -> &str {
        "统计员工在性别、年龄段、学历、司龄、薪资段、生日月份或部门上的分布和占比"
    }

    fn parameters(&self) -> &[ParamSpec] {
        PARAMS
    }

    fn triggers(&self) -> &[&'static str] {
        &["分布", "比例", "占比", "构成"]
    }

    async fn execute(&self, ctx: &ToolContext, params: &ToolParams) -> ToolCallResult<Value> {
        let dimension = match params.get("dimension") {
            Some(raw) => Dimension::parse(raw)
                .ok_or_else(|| ToolError::invalid("dimension", format!("不支持的维度：{}", raw)))?,
            None => Dimension::Department,
        };

        let department = params.get("department").map(String::as_str);
        let rows: Vec<&Row> = match department {
            Some(d) => ctx.rows_in(d),
            None => ctx.rows().iter().collect(),
        };
        if rows.is_empty() {
            return Err(ToolError::not_found(match department {
                Some(d) => format!("没有找到部门：{}", d),
                None => "没有员工数据".to_string(),
            }));
        }

        let mut output = serde_json::to_value(distribution(&rows, dimension))
            .map_err(|e| ToolError::Execution(e.to_string()))?;
        if let Some(map) = output.as_object_mut() {
            if let Some(d) = department {
                map.insert("department".to_string(), json!(d));
            }
            if dimension == Dimension::Salary {
                let summary = salary_summary(&rows)
                    .ok_or_else(|| ToolError::not_found("没有有效的薪资数据"))?;
                map.insert("summary".to_string(), json!(summary));
            }
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::fixtures;

    #[tokio::test]
    async fn test_defaults_to_department_dimension() {
        let out = DistributionStatsTool
            .execute(&fixtures::context(), &ToolParams::new())
            .await
            .unwrap();
        assert_eq!(out["dimension"], "department");
        assert_eq!(out["total"], 5);
        assert_eq!(out["buckets"][0]["label"], "研发部");
        assert_eq!(out["buckets"][0]["percentage"], 60.0);
    }

    #[tokio::test]
    async fn test_scoped_to_department() {
        let ctx = fixtures::context();
        let (params, missing) = DistributionStatsTool.extract_params("研发部的学历分布", &ctx);
        assert!(missing.is_empty());
        let out = DistributionStatsTool.execute(&ctx, &params).await.unwrap();
        assert_eq!(out["dimension"], "education");
        assert_eq!(out["department"], "研发部");
        assert_eq!(out["total"], 3);
        assert_eq!(out["buckets"][0]["label"], "硕士");
    }

    #[tokio::test]
    async fn test_salary_distribution_scoped_to_department() {
        let ctx = fixtures::context();
        let (params, _) = DistributionStatsTool.extract_params("研发部的薪资分布", &ctx);
        let out = DistributionStatsTool.execute(&ctx, &params).await.unwrap();
        assert_eq!(out["dimension"], "salary");
        assert_eq!(out["department"], "研发部");
        assert_eq!(out["total"], 3);
        let labels: Vec<&str> = out["buckets"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|b| b["label"].as_str())
            .collect();
        assert_eq!(labels, vec!["10000-15000", "15000-20000", "20000以上"]);
        assert_eq!(out["summary"]["min"], 12000.0);
        assert_eq!(out["summary"]["max"], 25000.0);
        assert_eq!(out["summary"]["mean"], 17333.3);
        assert_eq!(out["summary"]["median"], 15000.0);
    }

    #[tokio::test]
    async fn test_salary_distribution_without_salaries() {
        let rows: Vec<Row> = vec![json!({"name": "周八", "department": "综合部"})]
            .into_iter()
            .filter_map(|v| v.as_object().cloned())
            .collect();
        let ctx = ToolContext::new(std::sync::Arc::new(rows));
        let mut params = ToolParams::new();
        params.insert("dimension".to_string(), "salary".to_string());
        let err = DistributionStatsTool.execute(&ctx, &params).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_birth_month_distribution() {
        let ctx = fixtures::context();
        let (params, _) = DistributionStatsTool.extract_params("员工生日的月份分布", &ctx);
        let out = DistributionStatsTool.execute(&ctx, &params).await.unwrap();
        assert_eq!(out["dimension"], "birth_month");
        assert_eq!(out["buckets"][0]["label"], "3月");
        assert_eq!(out["buckets"][0]["count"], 2);
        assert_eq!(out["buckets"][2]["label"], "11月");
        assert_eq!(out["buckets"][2]["count"], 2);
    }

    #[tokio::test]
    async fn test_rejects_unknown_dimension() {
        let mut params = ToolParams::new();
        params.insert("dimension".to_string(), "星座".to_string());
        let err = DistributionStatsTool
            .execute(&fixtures::context(), &params)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameter { .. }));
    }
}
