//! Synthesis Prompts
//!
//! Message builders for the query-synthesis, clarification, repair and
//! summary calls. The summary prompts never carry query text, so a query
//! cannot leak into an answer.

use std::sync::OnceLock;

use regex::Regex;

use hr_copilot_core::{Message, RowSet, SchemaMapping};
use hr_copilot_tools::params::extract_departments;
use hr_copilot_tools::ToolResult;

const ANSWER_STYLE: &str = "用自然、口语化的中文直接回答问题，像同事之间聊天一样。\
不要提及SQL、查询语句、数据库或字段名，不要使用表格、代码块、标题、列表符号或任何Markdown格式。";

fn year_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:^|[^0-9])((?:19|20)[0-9]{2})(?:[^0-9]|$)").ok())
        .as_ref()
}

/// Situational guidance derived from the question text.
pub fn question_hints(question: &str, departments: &[String]) -> Vec<String> {
    let mut hints = Vec::new();

    if let Some(year) = year_pattern()
        .and_then(|re| re.captures(question))
        .and_then(|c| c.get(1))
    {
        hints.push(format!(
            "问题中包含年份{}：按入职年份筛选时使用 substr(hire_date, 1, 4) = '{}'，按出生年份筛选时使用 substr(birth_date, 1, 4) = '{}'",
            year.as_str(),
            year.as_str(),
            year.as_str()
        ));
    }

    for unit in extract_departments(question, departments) {
        let token = unit
            .trim_end_matches("中心")
            .trim_end_matches('部')
            .trim_end_matches('所');
        let token = if token.is_empty() { unit.as_str() } else { token };
        let related: Vec<&str> = departments
            .iter()
            .filter(|d| d.contains(token))
            .map(|d| d.as_str())
            .collect();
        if related.is_empty() {
            hints.push(format!(
                "问题提到“{}”，数据中没有同名部门，请使用 department LIKE '%{}%' 进行模糊匹配",
                unit, token
            ));
        } else {
            hints.push(format!(
                "问题提到“{}”，数据中相关的部门有：{}。名称完全一致时使用 department = '...'，否则使用 department LIKE '%{}%'",
                unit,
                related.join("、"),
                token
            ));
        }
    }

    if ["男", "女", "性别"].iter().any(|w| question.contains(w)) {
        hints.push("性别字段 gender 的取值只有'男'和'女'".to_string());
    }

    hints
}

fn schema_block(schema: &SchemaMapping, departments: &[String]) -> String {
    let mut block = schema.describe();
    if !schema.relationships().is_empty() {
        block.push_str("说明：\n");
        for note in schema.relationships() {
            block.push_str(&format!("- {}\n", note));
        }
    }
    if !departments.is_empty() {
        block.push_str(&format!("现有部门：{}\n", departments.join("、")));
    }
    block
}

/// First synthesis request.
pub fn synthesis_messages(
    schema: &SchemaMapping,
    departments: &[String],
    tool_lines: &str,
    question: &str,
    history: &[Message],
) -> Vec<Message> {
    let mut system = format!(
        "你是一名SQLite专家，负责把关于公司员工的问题转换成一条只读查询。\n\n{}\n\
         要求：\n\
         - 只写一条 SELECT（或 WITH ... SELECT）语句，不要修改数据\n\
         - 统计、分组、排序都在查询中完成\n\
         - 把查询放在 ```sql 代码块中\n",
        schema_block(schema, departments)
    );
    if !tool_lines.is_empty() {
        system.push_str(&format!(
            "\n如果下列工具能直接回答问题，也可以改为输出一个 ```tool_call 代码块，\
             第一行写 tool: 工具名，之后每行写 param: 参数名=值：\n{}\n",
            tool_lines
        ));
    }

    let hints = question_hints(question, departments);
    if !hints.is_empty() {
        system.push_str("\n提示：\n");
        for hint in &hints {
            system.push_str(&format!("- {}\n", hint));
        }
    }

    let mut messages = vec![Message::system(system)];
    messages.extend(history.iter().cloned());
    messages.push(Message::user(question.to_string()));
    messages
}

/// Second request after a reply with no recognizable query.
pub fn clarification_messages(
    schema: &SchemaMapping,
    departments: &[String],
    question: &str,
    previous_reply: &str,
) -> Vec<Message> {
    vec![
        Message::system(format!(
            "你是一名SQLite专家。\n\n{}\n只输出一个 ```sql 代码块，其中是一条只读 SELECT 语句，不要任何解释。",
            schema_block(schema, departments)
        )),
        Message::user(question.to_string()),
        Message::assistant(previous_reply.to_string()),
        Message::user("上面的回复中没有可执行的查询。请只给出一条回答该问题的 SELECT 语句。".to_string()),
    ]
}

/// Repair request after a query was rejected or failed.
pub fn repair_messages(
    schema: &SchemaMapping,
    departments: &[String],
    question: &str,
    failed_query: &str,
    error: &str,
) -> Vec<Message> {
    vec![
        Message::system(format!(
            "你是一名SQLite专家，负责修正出错的查询。\n\n{}\n\
             只输出修正后的一条只读 SELECT 语句，放在 ```sql 代码块中。",
            schema_block(schema, departments)
        )),
        Message::user(format!(
            "原始问题：{}\n\n出错的查询：\n{}\n\n错误信息：{}\n\n请根据错误信息和表结构给出修正后的查询。",
            question, failed_query, error
        )),
    ]
}

/// Summary of a query result.
pub fn row_summary_messages(
    question: &str,
    rows: &RowSet,
    summary_rows: usize,
    history: &[Message],
) -> Vec<Message> {
    let system = if rows.is_empty() {
        format!(
            "你是公司的HR数据助手。这次没有找到与问题相关的数据。\
             请礼貌地告诉用户没有找到相关信息，可以建议换一种问法，绝对不要编造任何数据。{}",
            ANSWER_STYLE
        )
    } else {
        format!(
            "你是公司的HR数据助手。请根据提供的数据回答用户的问题，只使用数据中出现的数字和名称。{}",
            ANSWER_STYLE
        )
    };

    let data = if rows.is_empty() {
        "数据：无".to_string()
    } else {
        let shown = rows.len().min(summary_rows);
        let preview = rows.preview(summary_rows);
        format!(
            "数据（共{}条，以下为前{}条）：\n{}",
            rows.total_rows,
            shown,
            serde_json::to_string(&preview).unwrap_or_else(|_| preview.to_string())
        )
    };

    let mut messages = vec![Message::system(system)];
    messages.extend(history.iter().cloned());
    messages.push(Message::user(format!("问题：{}\n\n{}", question, data)));
    messages
}

/// Summary of a tool call result.
pub fn tool_summary_messages(question: &str, result: &ToolResult, history: &[Message]) -> Vec<Message> {
    let mut messages = vec![Message::system(format!(
        "你是公司的HR数据助手。下面是一个分析工具针对用户问题返回的结果，\
         请据此回答问题，只使用结果中出现的数字和名称，不要编造数据。{}",
        ANSWER_STYLE
    ))];
    messages.extend(history.iter().cloned());
    messages.push(Message::user(format!(
        "问题：{}\n\n{}",
        question,
        result.to_content()
    )));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn departments() -> Vec<String> {
        vec!["研发部".to_string(), "研发中心".to_string(), "市场部".to_string()]
    }

    #[test]
    fn test_year_hint() {
        let hints = question_hints("2020年入职的有多少人", &departments());
        assert!(hints.iter().any(|h| h.contains("substr(hire_date, 1, 4) = '2020'")));
        assert!(question_hints("工号12345的员工", &[]).is_empty());
    }

    #[test]
    fn test_unit_hint_lists_related_departments() {
        let hints = question_hints("研发部有多少人", &departments());
        let unit = hints.iter().find(|h| h.contains("研发部")).unwrap();
        assert!(unit.contains("研发中心"));
        assert!(unit.contains("LIKE '%研发%'"));
    }

    #[test]
    fn test_gender_hint() {
        let hints = question_hints("女员工多少人", &[]);
        assert!(hints.iter().any(|h| h.contains("'男'和'女'")));
    }

    #[test]
    fn test_synthesis_prompt_contains_schema_and_question() {
        let schema = SchemaMapping::employees();
        let messages = synthesis_messages(&schema, &departments(), "", "研发部有多少人", &[]);
        assert!(messages[0].content.contains("hire_date"));
        assert!(messages[0].content.contains("现有部门"));
        assert!(!messages[0].content.contains("tool_call"));
        assert_eq!(messages.last().unwrap().content, "研发部有多少人");
    }

    #[test]
    fn test_summary_prompts() {
        let empty = RowSet::default();
        let messages = row_summary_messages("谁是张三", &empty, 50, &[]);
        assert!(messages[0].content.contains("没有找到"));

        let rows = RowSet {
            columns: vec!["headcount".to_string()],
            rows: vec![json!({"headcount": 3}).as_object().cloned().unwrap()],
            total_rows: 1,
            truncated: false,
        };
        let messages = row_summary_messages("研发部有多少人", &rows, 50, &[]);
        let user = &messages.last().unwrap().content;
        assert!(user.contains("\"headcount\":3"));
        assert!(!user.to_uppercase().contains("SELECT"));
    }
}
