//! Orchestrator Integration Tests
//!
//! Whole-question flows: strategy plans, fallback, timeouts and the answer
//! cache.

use std::time::{Duration, Instant};

use hr_copilot::services::{ERROR_MESSAGE, TIMEOUT_MESSAGE};
use hr_copilot::{AppConfig, Strategy};
use hr_copilot_core::{Classification, Conversation, Message};
use hr_copilot_llm::testing::ScriptedProvider;

use crate::support::{
    harness, harness_with, sql, CHAT_MODEL, CLASSIFIER_MODEL, SQL_MODEL, SUMMARY_MODEL,
};

// ============================================================================
// Happy paths
// ============================================================================

#[tokio::test]
async fn test_department_headcount() {
    let h = harness(
        ScriptedProvider::new()
            .reply(
                SQL_MODEL,
                &sql("SELECT COUNT(*) AS headcount FROM employees WHERE department = '研发部'"),
            )
            .reply(SUMMARY_MODEL, "研发部目前一共有3位同事。"),
    )
    .await;

    let answer = h.orchestrator.answer(&Conversation::from_question("研发部有多少人？")).await;

    assert_eq!(answer.text, "研发部目前一共有3位同事。");
    assert_eq!(answer.strategy, Strategy::QuerySynthesis);
    assert_eq!(answer.classification, Some(Classification::SqlQuery));
    assert!(!answer.fallback_used);
    assert_eq!(h.provider.calls_for(CLASSIFIER_MODEL), 0);
    assert!(h.provider.calls()[1].transcript().contains("\"headcount\":3"));
}

#[tokio::test]
async fn test_novel_question_with_classifier_down_goes_direct() {
    let reply = "我们公司倡导开放协作和持续学习，欢迎随时和同事们交流。";
    let h = harness(ScriptedProvider::new().reply(CHAT_MODEL, reply)).await;
    let question = "给我讲讲公司的企业文化吧";

    let answer = h.orchestrator.answer(&Conversation::from_question(question)).await;

    assert_eq!(answer.text, reply);
    assert_eq!(answer.strategy, Strategy::Direct);
    assert_eq!(answer.classification, Some(Classification::HybridQuery));
    assert!(!answer.fallback_used);
    assert!(h.orchestrator.classification_cache().get(question).is_none());
    assert_eq!(h.provider.calls_for(CLASSIFIER_MODEL), 1);
    assert_eq!(h.provider.calls_for(SQL_MODEL), 0);
}

#[tokio::test]
async fn test_answer_never_carries_query_text() {
    let h = harness(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT AVG(monthly_pay) FROM employees WHERE department = '研发部'"))
            .reply(
                SQL_MODEL,
                &sql("SELECT ROUND(AVG(salary), 1) AS average_salary FROM employees WHERE department = '研发部'"),
            )
            .reply(
                SUMMARY_MODEL,
                "我用下面的查询算了一下：\n```sql\nSELECT ROUND(AVG(salary), 1) FROM employees\n```\n研发部的平均月薪是21000元。",
            ),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("研发部员工的平均工资是多少"))
        .await;

    assert_eq!(answer.strategy, Strategy::QuerySynthesis);
    assert!(answer.text.contains("21000"));
    assert!(!answer.text.to_uppercase().contains("SELECT"));
    assert!(!answer.text.contains("```"));
}

// ============================================================================
// Fallback
// ============================================================================

#[tokio::test]
async fn test_failed_query_falls_back_to_direct_without_data() {
    let h = harness(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT nickname FROM employees"))
            .reply(SQL_MODEL, &sql("SELECT nick FROM employees"))
            .reply(CHAT_MODEL, "暂时查不到同事们的昵称，您可以换个问法试试。"),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("员工的昵称有哪些"))
        .await;

    assert_eq!(answer.strategy, Strategy::Direct);
    assert!(answer.fallback_used);
    assert_eq!(h.provider.calls_for(SQL_MODEL), 2);
    let chat = h.provider.calls().last().unwrap().transcript();
    assert!(chat.contains("暂时无法从员工数据中查到结果"));
    assert!(!chat.contains("公司概况"));
}

#[tokio::test]
async fn test_empty_result_keeps_not_found_answer() {
    let not_found = "抱歉，没有找到相关信息，公司名册里没有叫钱十一的同事。";
    let h = harness(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT department FROM employees WHERE name = '钱十一'"))
            .reply(SUMMARY_MODEL, not_found)
            .reply(CHAT_MODEL, "钱十一在研发部担任高级工程师，月薪28000元。"),
    )
    .await;
    let question = "钱十一在哪个部门";

    let answer = h.orchestrator.answer(&Conversation::from_question(question)).await;

    assert_eq!(answer.text, not_found);
    assert_eq!(answer.strategy, Strategy::QuerySynthesis);
    assert_eq!(answer.classification, Some(Classification::SqlQuery));
    assert!(!answer.fallback_used);
    assert_eq!(h.provider.calls_for(CHAT_MODEL), 0);
    assert!(h.provider.calls()[1].transcript().contains("数据：无"));
    // flagged by the gate, so never cached
    assert!(h.orchestrator.answer_cache().get(question).is_none());
}

#[tokio::test]
async fn test_low_quality_answers_stop_after_one_fallback() {
    let h = harness(
        ScriptedProvider::new()
            .reply(CLASSIFIER_MODEL, "GENERAL_QUERY")
            .reply(CHAT_MODEL, "没有找到相关信息")
            .reply(SQL_MODEL, &sql("SELECT COUNT(*) AS headcount FROM employees"))
            .reply(SUMMARY_MODEL, "没有找到相关信息"),
    )
    .await;
    let question = "你们这边怎么样";

    let answer = h.orchestrator.answer(&Conversation::from_question(question)).await;

    assert_eq!(answer.text, "没有找到相关信息");
    assert_eq!(answer.strategy, Strategy::QuerySynthesis);
    assert!(answer.fallback_used);
    assert_eq!(h.provider.calls_for(CHAT_MODEL), 1);
    assert_eq!(h.provider.calls_for(SQL_MODEL), 1);
    assert_eq!(h.provider.calls_for(SUMMARY_MODEL), 1);
    assert!(h.orchestrator.answer_cache().get(question).is_none());
}

#[tokio::test]
async fn test_everything_down_ends_in_apology() {
    let h = harness(ScriptedProvider::new()).await;

    for question in ["研发部有多少人", "给我讲讲公司的企业文化吧", "画一个饼图看看性别"] {
        let answer = h.orchestrator.answer(&Conversation::from_question(question)).await;
        assert_eq!(answer.text, ERROR_MESSAGE, "question: {}", question);
        assert_eq!(answer.strategy, Strategy::Apology);
    }
    // classifier, then at most one call per strategy tier attempt
    assert!(h.provider.calls().len() <= 6);
}

// ============================================================================
// Timeouts
// ============================================================================

#[tokio::test]
async fn test_slow_strategy_times_out() {
    let mut config = AppConfig::default();
    config.pipeline.strategy_timeout_secs = 1;
    let h = harness_with(
        ScriptedProvider::new().delayed(
            SQL_MODEL,
            Duration::from_secs(5),
            &sql("SELECT COUNT(*) FROM employees"),
        ),
        config,
    )
    .await;

    let started = Instant::now();
    let answer = h.orchestrator.answer(&Conversation::from_question("研发部有多少人")).await;

    assert_eq!(answer.text, TIMEOUT_MESSAGE);
    assert_eq!(answer.strategy, Strategy::Apology);
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_fast_strategy_within_budget() {
    let mut config = AppConfig::default();
    config.pipeline.strategy_timeout_secs = 2;
    let h = harness_with(
        ScriptedProvider::new()
            .delayed(SQL_MODEL, Duration::from_millis(50), &sql("SELECT COUNT(*) AS headcount FROM employees"))
            .reply(SUMMARY_MODEL, "公司一共有8位同事。"),
        config,
    )
    .await;

    let answer = h.orchestrator.answer(&Conversation::from_question("公司一共有多少人")).await;
    assert_eq!(answer.text, "公司一共有8位同事。");
}

// ============================================================================
// Answer cache
// ============================================================================

#[tokio::test]
async fn test_repeat_question_served_from_answer_cache() {
    let h = harness(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT COUNT(*) AS headcount FROM employees"))
            .reply(SUMMARY_MODEL, "公司一共有8位同事。"),
    )
    .await;

    let first = h.orchestrator.answer(&Conversation::from_question("公司一共有多少人？")).await;
    let second = h.orchestrator.answer(&Conversation::from_question("公司一共有多少人")).await;

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.strategy, Strategy::Cached);
    assert_eq!(second.text, first.text);
    assert_eq!(h.provider.calls().len(), 2);
}

#[tokio::test]
async fn test_person_and_relative_time_questions_not_cached() {
    let h = harness(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT name, position FROM employees WHERE name = '张三'"))
            .reply(SUMMARY_MODEL, "张三是研发部的工程师。")
            .reply(SQL_MODEL, &sql("SELECT COUNT(*) AS headcount FROM employees WHERE hire_date >= '2026-10-01'"))
            .reply(SUMMARY_MODEL, "最近没有新同事入职。"),
    )
    .await;

    h.orchestrator.answer(&Conversation::from_question("谁是张三")).await;
    h.orchestrator.answer(&Conversation::from_question("最近入职了多少人")).await;

    assert!(h.orchestrator.answer_cache().is_empty());
}

#[tokio::test]
async fn test_follow_up_bypasses_answer_cache() {
    let h = harness(
        ScriptedProvider::new()
            .reply(SQL_MODEL, &sql("SELECT COUNT(*) AS headcount FROM employees"))
            .reply(SUMMARY_MODEL, "公司一共有8位同事。")
            .reply(SQL_MODEL, &sql("SELECT COUNT(*) AS headcount FROM employees"))
            .reply(SUMMARY_MODEL, "还是8位同事。"),
    )
    .await;

    h.orchestrator.answer(&Conversation::from_question("公司一共有多少人")).await;

    let conversation = Conversation::new(vec![
        Message::user("市场部怎么样"),
        Message::assistant("市场部有2位同事。"),
        Message::user("公司一共有多少人"),
    ]);
    let answer = h.orchestrator.answer(&conversation).await;

    assert!(!answer.from_cache);
    assert_eq!(answer.text, "还是8位同事。");
    let summary = h.provider.calls().last().unwrap().transcript();
    assert!(summary.contains("市场部有2位同事。"));
}
