//! Query Synthesis Integration Tests
//!
//! Synthesis against the real snapshot: validation, the bounded repair
//! loop, and what reaches the summary prompt.

use std::sync::Arc;

use hr_copilot::models::settings::PipelineSettings;
use hr_copilot::services::synthesizer::{validate_query, FORBIDDEN_KEYWORDS};
use hr_copilot::services::{QuerySource, QuerySynthesizer, SynthesisResult};
use hr_copilot::storage::RecordSnapshot;
use hr_copilot::AppError;
use hr_copilot_core::number_field;
use hr_copilot_llm::testing::ScriptedProvider;
use hr_copilot_tools::builtin_registry;
use proptest::prelude::*;

use crate::support::{client, snapshot, sql, HEADCOUNT, SQL_MODEL, SUMMARY_MODEL};

async fn synthesizer(provider: Arc<ScriptedProvider>) -> (QuerySynthesizer, Arc<RecordSnapshot>) {
    let snapshot = snapshot().await;
    let synthesizer = QuerySynthesizer::new(
        Arc::new(client(provider)),
        snapshot.clone(),
        Arc::new(builtin_registry()),
        &PipelineSettings::default(),
    );
    (synthesizer, snapshot)
}

async fn headcount(snapshot: &RecordSnapshot) -> i64 {
    let rows = snapshot
        .run_query("SELECT COUNT(*) AS n FROM employees")
        .await
        .unwrap();
    number_field(&rows.rows[0], "n").unwrap() as i64
}

// ============================================================================
// Repair loop
// ============================================================================

#[tokio::test]
async fn test_bad_column_is_repaired_once() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply(
                SQL_MODEL,
                &sql("SELECT AVG(monthly_pay) FROM employees WHERE department = '研发部'"),
            )
            .reply(
                SQL_MODEL,
                &sql("SELECT ROUND(AVG(salary), 1) AS average_salary FROM employees WHERE department = '研发部'"),
            )
            .reply(SUMMARY_MODEL, "研发部同事的平均月薪是21000元。"),
    );
    let (synthesizer, _) = synthesizer(provider.clone()).await;

    let (answer, chain) = synthesizer.answer("研发部员工的平均工资是多少", &[]).await;
    let answer = answer.unwrap();
    assert_eq!(answer.text, "研发部同事的平均月薪是21000元。");

    let chain = chain.unwrap();
    assert_eq!(chain.repair_count(), 1);
    let attempts = chain.attempts();
    assert!(attempts[0].error.is_some());
    assert_eq!(attempts[1].source, QuerySource::Repair);
    assert!(attempts[1].error.is_none());

    let calls = provider.calls();
    let repair = calls[1].transcript();
    assert!(repair.contains("monthly_pay"));
    assert!(repair.contains("错误信息"));

    let summary = calls[2].transcript();
    assert!(summary.contains("21000"));
    assert!(!summary.contains("monthly_pay"));
    assert!(!summary.to_uppercase().contains("SELECT"));
}

#[tokio::test]
async fn test_repairs_are_bounded() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT nickname FROM employees"))
            .reply(SQL_MODEL, &sql("SELECT nickname2 FROM employees"))
            .reply(SQL_MODEL, &sql("SELECT COUNT(*) FROM employees")),
    );
    let (synthesizer, _) = synthesizer(provider.clone()).await;

    let outcome = synthesizer.synthesize_and_run("员工的昵称有哪些", &[]).await;
    assert!(outcome.result.unwrap_err().is_query_failure());
    assert_eq!(outcome.chain.unwrap().attempts().len(), 2);
    assert_eq!(provider.calls_for(SQL_MODEL), 2);
    assert_eq!(provider.calls_for(SUMMARY_MODEL), 0);
}

// ============================================================================
// Read-only enforcement
// ============================================================================

#[tokio::test]
async fn test_mutating_queries_never_reach_the_snapshot() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT 1; DROP TABLE employees"))
            .reply(SQL_MODEL, &sql("DELETE FROM employees")),
    );
    let (synthesizer, snapshot) = synthesizer(provider.clone()).await;

    let outcome = synthesizer.synthesize_and_run("清空员工表", &[]).await;
    assert!(matches!(outcome.result, Err(AppError::Validation(_))));
    let chain = outcome.chain.unwrap();
    assert!(chain.attempts().iter().all(|a| !a.valid));
    assert_eq!(headcount(&snapshot).await, HEADCOUNT);
}

/// Upper-case the characters of `word` whose bit is set in `mask`.
fn with_casing(word: &str, mask: u32) -> String {
    word.chars()
        .enumerate()
        .map(|(i, c)| if mask & (1 << (i % 32)) != 0 { c.to_ascii_uppercase() } else { c })
        .collect()
}

const FRAGMENT: &str = "[a-z0-9_ ,()*=<>']{0,24}";

proptest! {
    #[test]
    fn forbidden_keywords_rejected_in_any_position_or_case(
        keyword in prop::sample::select(FORBIDDEN_KEYWORDS),
        mask in any::<u32>(),
        leading in any::<bool>(),
        before in FRAGMENT,
        after in FRAGMENT,
    ) {
        let keyword = with_casing(keyword, mask);
        let query = if leading {
            format!("{} {}", keyword, after)
        } else {
            format!("SELECT {} {} {}", before, keyword, after)
        };
        prop_assert!(validate_query(&query).is_err(), "accepted: {}", query);
    }

    #[test]
    fn system_tables_rejected(
        columns in "[a-z_*]{1,10}",
        schema in prop::sample::select(&["", "main.", "temp."][..]),
        suffix in "[a-z_]{0,10}",
        mask in any::<u32>(),
    ) {
        let table = with_casing(&format!("sqlite_{}", suffix), mask);
        let query = format!("SELECT {} FROM {}{}", columns, schema, table);
        prop_assert!(validate_query(&query).is_err(), "accepted: {}", query);
    }

    #[test]
    fn multiple_statements_rejected(
        first in "SELECT [a-z0-9 ,*]{0,16}",
        separators in "( ?;){1,3} ?",
        second in "[a-zA-Z0-9(*][a-zA-Z0-9 ,*()]{0,16}",
    ) {
        let query = format!("{}{}{}", first, separators, second);
        prop_assert!(validate_query(&query).is_err(), "accepted: {}", query);
    }

    #[test]
    fn plain_reads_accepted_without_trailing_separators(
        column in prop::sample::select(&["name", "age", "department", "salary", "hire_date"][..]),
        literal in "[0-9研发市场部张李王]{0,8}",
        trailing in "[; ]{0,3}",
    ) {
        let statement = format!("SELECT {} FROM employees WHERE {} = '{}'", column, column, literal);
        let validated = validate_query(&format!("{}{}", statement, trailing));
        prop_assert_eq!(validated.ok(), Some(statement));
    }
}

#[test]
fn test_statement_separators_and_system_tables_rejected() {
    for query in [
        "SELECT 1; SELECT 2",
        "SELECT 1; ; SELECT 2",
        "SELECT name FROM sqlite_master",
        "SELECT * FROM SQLITE_SCHEMA",
        "VALUES (1)",
        "",
        "  ;  ",
    ] {
        assert!(validate_query(query).is_err(), "accepted: {:?}", query);
    }
}

#[test]
fn test_trailing_separators_are_stripped() {
    assert_eq!(validate_query("SELECT 1;; ").unwrap(), "SELECT 1");
}

#[test]
fn test_plain_reads_accepted() {
    for query in [
        "SELECT COUNT(*) FROM employees;",
        "  (SELECT name FROM employees)",
        "WITH d AS (SELECT department FROM employees) SELECT COUNT(*) FROM d",
        "select created_by_hr, updated_at from employees",
    ] {
        assert!(validate_query(query).is_ok(), "rejected: {}", query);
    }
}

// ============================================================================
// Tool calls and empty results
// ============================================================================

#[tokio::test]
async fn test_tool_call_reply_is_dispatched() {
    let reply = "这个问题用工具更合适：\n```tool_call\ntool: analyze_department\nparam: department=市场部\n```";
    let provider = Arc::new(ScriptedProvider::new().reply(SQL_MODEL, reply));
    let (synthesizer, _) = synthesizer(provider).await;

    let outcome = synthesizer.synthesize_and_run("市场部怎么样", &[]).await;
    match outcome.result.unwrap() {
        SynthesisResult::Tool(result) => {
            assert_eq!(result.tool, "analyze_department");
            assert!(result.is_success());
        }
        other => panic!("expected tool result, got {:?}", other),
    }
    assert!(outcome.chain.is_none());
}

#[tokio::test]
async fn test_empty_result_still_summarized() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT name FROM employees WHERE department = '财务部'"))
            .reply(SUMMARY_MODEL, "财务部目前没有在册的同事，可以换个部门问问。"),
    );
    let (synthesizer, _) = synthesizer(provider.clone()).await;

    let (answer, _) = synthesizer.answer("财务部有哪些人", &[]).await;
    let answer = answer.unwrap();
    assert!(answer.rows.unwrap().is_empty());
    assert!(provider.calls()[1].transcript().contains("数据：无"));
}
