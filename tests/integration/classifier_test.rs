//! Classifier Integration Tests
//!
//! Rule routing, model fallback, and classification cache behavior through
//! a scripted classifier model.

use std::sync::Arc;

use hr_copilot::services::{ClassificationCache, QuestionClassifier};
use hr_copilot_core::Classification;
use hr_copilot_llm::testing::{ScriptedProvider, ScriptedReply};
use hr_copilot_tools::builtin_registry;

use crate::support::{client, CLASSIFIER_MODEL};

fn classifier(provider: Arc<ScriptedProvider>, capacity: usize) -> QuestionClassifier {
    QuestionClassifier::new(
        Arc::new(client(provider)),
        Arc::new(ClassificationCache::new(capacity)),
        &builtin_registry(),
    )
}

// ============================================================================
// Rules
// ============================================================================

#[tokio::test]
async fn test_rule_hits_skip_the_model() {
    let provider = Arc::new(ScriptedProvider::new());
    let classifier = classifier(provider.clone(), 100);

    assert_eq!(classifier.classify("研发部有多少人？").await, Classification::SqlQuery);
    assert_eq!(classifier.classify("数字经济研究所的人员构成").await, Classification::SqlQuery);
    assert_eq!(classifier.classify("画一个饼图看看性别").await, Classification::Visualization);
    assert_eq!(classifier.classify("预测一下明年的离职趋势").await, Classification::DataAnalysis);
    assert_eq!(provider.calls_for(CLASSIFIER_MODEL), 0);
}

#[tokio::test]
async fn test_empty_question_is_general() {
    let provider = Arc::new(ScriptedProvider::new());
    let classifier = classifier(provider.clone(), 100);
    assert_eq!(classifier.classify("   ").await, Classification::GeneralQuery);
    assert!(provider.calls().is_empty());
}

// ============================================================================
// Model path
// ============================================================================

#[tokio::test]
async fn test_model_label_and_tool_label() {
    let provider = Arc::new(
        ScriptedProvider::new()
            .reply(CLASSIFIER_MODEL, "GENERAL_QUERY")
            .reply(CLASSIFIER_MODEL, "TOOL:find_employee"),
    );
    let classifier = classifier(provider.clone(), 100);

    assert_eq!(classifier.classify("你好").await, Classification::GeneralQuery);
    assert_eq!(
        classifier.classify("张三是做什么工作的").await,
        Classification::Tool("find_employee".to_string())
    );

    let prompt = provider.calls()[0].transcript();
    assert!(prompt.contains("TOOL:<工具名>"));
    assert!(prompt.contains("find_employee"));
}

#[tokio::test]
async fn test_unrecognized_reply_defaults_to_hybrid_and_is_cached() {
    let provider = Arc::new(ScriptedProvider::new().reply(CLASSIFIER_MODEL, "我觉得这个问题很有意思"));
    let classifier = classifier(provider.clone(), 100);

    assert_eq!(classifier.classify("你好").await, Classification::HybridQuery);
    assert_eq!(classifier.cache().get("你好"), Some(Classification::HybridQuery));
}

#[tokio::test]
async fn test_provider_failure_is_not_cached() {
    let provider = Arc::new(ScriptedProvider::new());
    let classifier = classifier(provider.clone(), 100);

    assert_eq!(classifier.classify("你好").await, Classification::HybridQuery);
    assert!(classifier.cache().get("你好").is_none());

    provider.enqueue(CLASSIFIER_MODEL, ScriptedReply::Text("GENERAL_QUERY".to_string()));
    assert_eq!(classifier.classify("你好").await, Classification::GeneralQuery);
    assert_eq!(provider.calls_for(CLASSIFIER_MODEL), 2);
}

// ============================================================================
// Cache
// ============================================================================

#[tokio::test]
async fn test_second_ask_is_served_from_cache() {
    let provider = Arc::new(ScriptedProvider::new().reply(CLASSIFIER_MODEL, "GENERAL_QUERY"));
    let classifier = classifier(provider.clone(), 100);

    let first = classifier.classify("Hello there!").await;
    let second = classifier.classify("  hello   THERE ").await;
    assert_eq!(first, second);
    assert_eq!(provider.calls_for(CLASSIFIER_MODEL), 1);
}

#[tokio::test]
async fn test_capacity_evicts_oldest_half() {
    let provider = Arc::new(
        ScriptedProvider::new().otherwise(ScriptedReply::Text("GENERAL_QUERY".to_string())),
    );
    let classifier = classifier(provider.clone(), 4);

    for question in ["你好", "谢谢你", "早上好呀", "再见啦"] {
        classifier.classify(question).await;
    }
    assert_eq!(classifier.cache().len(), 4);

    classifier.classify("晚安").await;
    assert_eq!(classifier.cache().len(), 3);
    assert!(classifier.cache().get("你好").is_none());
    assert!(classifier.cache().get("谢谢你").is_none());
    assert!(classifier.cache().get("早上好呀").is_some());
    assert!(classifier.cache().get("晚安").is_some());
    assert_eq!(provider.calls_for(CLASSIFIER_MODEL), 5);

    classifier.classify("晚安").await;
    assert_eq!(provider.calls_for(CLASSIFIER_MODEL), 5);
    classifier.classify("你好").await;
    assert_eq!(provider.calls_for(CLASSIFIER_MODEL), 6);
}
