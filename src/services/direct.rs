//! Direct Conversational Strategy
//!
//! Answers on the chat tier with a company overview and the records the
//! question refers to in the system prompt, instead of running a query.

use std::sync::Arc;

use hr_copilot_core::{text_field, Message, Row};
use hr_copilot_llm::{ModelClient, ModelTier};
use hr_copilot_tools::params::extract_departments;
use hr_copilot_tools::stats::department_profile;
use hr_copilot_tools::ToolContext;

use crate::storage::RecordSnapshot;
use crate::utils::error::AppResult;

/// Employees listed in the relevant-data block at most.
const MAX_NAMED_EMPLOYEES: usize = 5;

/// Columns shown for a named employee, with their labels.
const EMPLOYEE_FIELDS: &[(&str, &str)] = &[
    ("department", "部门"),
    ("position", "职位"),
    ("title", "职称"),
    ("gender", "性别"),
    ("age", "年龄"),
    ("education", "学历"),
    ("university", "毕业院校"),
    ("major", "专业"),
    ("hire_date", "入职日期"),
];

/// Whether record data may back the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataAvailability {
    Available,
    /// A query for this question already failed; numbers must not be given.
    Unavailable,
}

pub struct DirectResponder {
    client: Arc<ModelClient>,
    snapshot: Arc<RecordSnapshot>,
}

impl DirectResponder {
    pub fn new(client: Arc<ModelClient>, snapshot: Arc<RecordSnapshot>) -> Self {
        Self { client, snapshot }
    }

    pub async fn answer(
        &self,
        question: &str,
        history: &[Message],
        availability: DataAvailability,
    ) -> AppResult<String> {
        let messages = self.messages(question, history, availability);
        Ok(self.client.complete(messages, ModelTier::Chat).await?)
    }

    fn messages(
        &self,
        question: &str,
        history: &[Message],
        availability: DataAvailability,
    ) -> Vec<Message> {
        let mut system = String::from(
            "你是公司的HR助手，负责回答同事们关于公司员工和部门的问题。\
             用自然、口语化的中文回答，不要使用Markdown格式、表格或代码块。\n",
        );

        match availability {
            DataAvailability::Available => {
                if let Ok(stats) = self.snapshot.stats() {
                    system.push_str("\n公司概况：\n");
                    system.push_str(&stats.overview());
                }
                let relevant = relevant_data(question, &self.snapshot.tool_context());
                if !relevant.is_empty() {
                    system.push_str("\n相关数据：\n");
                    system.push_str(&relevant);
                }
                system.push_str(
                    "\n只能使用上面提供的数据回答涉及数字或人员的问题；数据中没有的信息，\
                     请如实说明，绝对不要编造。",
                );
            }
            DataAvailability::Unavailable => {
                system.push_str(
                    "\n注意：这个问题暂时无法从员工数据中查到结果。请不要给出任何具体数字、\
                     人名或统计结果，可以礼貌说明暂时查不到，并建议换一种更具体的问法。",
                );
            }
        }

        let mut messages = vec![Message::system(system)];
        messages.extend(history.iter().cloned());
        messages.push(Message::user(question.to_string()));
        messages
    }
}

/// Records of employees named in the question and profiles of the
/// departments it mentions.
pub fn relevant_data(question: &str, ctx: &ToolContext) -> String {
    let mut out = String::new();

    let named: Vec<&Row> = ctx
        .rows()
        .iter()
        .filter(|row| {
            text_field(row, "name")
                .is_some_and(|name| name.chars().count() >= 2 && question.contains(&*name))
        })
        .take(MAX_NAMED_EMPLOYEES)
        .collect();
    for row in named {
        out.push_str(&employee_line(row));
        out.push('\n');
    }

    for department in extract_departments(question, ctx.departments()) {
        let rows = ctx.rows_in(&department);
        if rows.is_empty() {
            continue;
        }
        let profile = department_profile(&department, &rows);
        let mut line = format!("{}：共{}人", profile.department, profile.headcount);
        if let Some(age) = &profile.age {
            line.push_str(&format!("，平均年龄{:.1}岁", age.mean));
        }
        let gender: Vec<String> = profile
            .gender
            .buckets
            .iter()
            .map(|b| format!("{}{}人", b.label, b.count))
            .collect();
        if !gender.is_empty() {
            line.push_str(&format!("，{}", gender.join("、")));
        }
        out.push_str(&line);
        out.push('\n');
    }

    out
}

fn employee_line(row: &Row) -> String {
    let name = text_field(row, "name").unwrap_or_default();
    let fields: Vec<String> = EMPLOYEE_FIELDS
        .iter()
        .filter_map(|(column, label)| {
            text_field(row, column).map(|value| format!("{}{}", label, value))
        })
        .collect();
    format!("{}：{}", name, fields.join("，"))
}
