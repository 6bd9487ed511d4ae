//! Tool Calling Integration Tests
//!
//! Tool routing through the orchestrator: visualization questions, model
//! issued tool labels, hybrid selection, and skipped tools falling back.

use hr_copilot::Strategy;
use hr_copilot_core::{Classification, Conversation};
use hr_copilot_llm::testing::ScriptedProvider;

use crate::support::{harness, sql, CHAT_MODEL, CLASSIFIER_MODEL, SQL_MODEL, SUMMARY_MODEL};

#[tokio::test]
async fn test_visualization_uses_distribution_tool() {
    let h = harness(
        ScriptedProvider::new().reply(CHAT_MODEL, "公司男女同事各4位，比例正好一半一半。"),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("画一个饼图看看性别"))
        .await;

    assert_eq!(answer.strategy, Strategy::Tool("distribution_stats".to_string()));
    assert_eq!(answer.classification, Some(Classification::Visualization));
    let prompt = h.provider.calls()[0].transcript();
    assert!(prompt.contains("distribution_stats"));
    assert!(prompt.contains("gender"));
}

#[tokio::test]
async fn test_salary_chart_uses_salary_bands() {
    let h = harness(
        ScriptedProvider::new().reply(CHAT_MODEL, "一半同事的月薪在20000元以上，中位数是20000元。"),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("画一个饼图看看工资分布"))
        .await;

    assert_eq!(answer.strategy, Strategy::Tool("distribution_stats".to_string()));
    let prompt = h.provider.calls()[0].transcript();
    assert!(prompt.contains("salary"));
    assert!(prompt.contains("20000以上"));
    assert!(prompt.contains("19125"));
}

#[tokio::test]
async fn test_model_tool_label_dispatches_named_tool() {
    let h = harness(
        ScriptedProvider::new()
            .reply(CLASSIFIER_MODEL, "TOOL:find_employee")
            .reply(CHAT_MODEL, "张三在研发部做工程师，2019年入职。"),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("张三是做什么工作的"))
        .await;

    assert_eq!(answer.strategy, Strategy::Tool("find_employee".to_string()));
    assert_eq!(answer.text, "张三在研发部做工程师，2019年入职。");
    let summary = h.provider.calls().last().unwrap().transcript();
    assert!(summary.contains("研发部"));
    assert!(summary.contains("工程师"));
}

#[tokio::test]
async fn test_hybrid_question_selects_matching_tool() {
    let h = harness(
        ScriptedProvider::new()
            .reply(CLASSIFIER_MODEL, "HYBRID_QUERY")
            .reply(CHAT_MODEL, "李四是研发部的高级工程师，有博士学位。"),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("李四这个人怎么样"))
        .await;

    assert_eq!(answer.strategy, Strategy::Tool("find_employee".to_string()));
    assert!(!answer.fallback_used);
}

#[tokio::test]
async fn test_skipped_tool_falls_back_to_synthesis() {
    let h = harness(
        ScriptedProvider::new()
            .reply(CLASSIFIER_MODEL, "TOOL:compare_departments")
            .reply(SQL_MODEL, &sql("SELECT department, COUNT(*) AS headcount FROM employees GROUP BY department"))
            .reply(SUMMARY_MODEL, "研发部3人，市场部2人，综合协同部2人，数字经济研究所1人。"),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("帮我比较一下吧"))
        .await;

    assert_eq!(answer.strategy, Strategy::QuerySynthesis);
    assert!(answer.fallback_used);
    assert_eq!(h.provider.calls_for(CHAT_MODEL), 0);
}
