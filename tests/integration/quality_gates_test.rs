//! Quality Gate and Sanitizer Integration Tests
//!
//! What the user sees after the gate and the sanitizer have run.

use hr_copilot::{AppConfig, Strategy};
use hr_copilot_core::Conversation;
use hr_copilot_llm::testing::ScriptedProvider;
use hr_copilot_quality_gates::{QualityGate, ResponseSanitizer};

use crate::support::{harness, CHAT_MODEL, CLASSIFIER_MODEL};

// ============================================================================
// Sanitizer
// ============================================================================

#[test]
fn test_sanitize_is_idempotent() {
    let sanitizer = ResponseSanitizer::new(&AppConfig::default().sanitizer);
    let samples = [
        "我将使用以下SQL查询来回答你的问题：\n```sql\nSELECT COUNT(*) FROM employees\n```\n研发部共有3人。",
        "## 部门概况\n\n| 部门 | 人数 |\n| 研发部 | 3 |\n\n- **市场部**：2人",
        "```tool_call\ntool: find_employee\nparam: name=张三\n```\n张三在研发部。",
        "结果如下\n```sql\nSELECT *",
        "> 提示：`department` 字段来自[人事系统](http://hr)   \n\n\n\n好的。",
        "普通的一句话。",
        "",
    ];
    for sample in samples {
        let once = sanitizer.sanitize(sample);
        assert_eq!(sanitizer.sanitize(&once), once, "sample: {:?}", sample);
        assert!(!once.contains("```"));
    }
}

#[tokio::test]
async fn test_markdown_answer_is_flattened() {
    let h = harness(
        ScriptedProvider::new()
            .reply(CLASSIFIER_MODEL, "GENERAL_QUERY")
            .reply(CHAT_MODEL, "## 企业文化\n- **开放**协作\n```sql\nSELECT 1\n```\n欢迎交流。"),
    )
    .await;

    let answer = h
        .orchestrator
        .answer(&Conversation::from_question("给我讲讲公司的企业文化吧"))
        .await;

    assert_eq!(answer.strategy, Strategy::Direct);
    assert!(answer.text.contains("开放协作"));
    assert!(answer.text.contains("欢迎交流。"));
    for marker in ["##", "**", "```", "SELECT", "- "] {
        assert!(!answer.text.contains(marker), "found {:?} in {:?}", marker, answer.text);
    }
}

// ============================================================================
// Gate
// ============================================================================

#[test]
fn test_gate_defaults() {
    let gate = QualityGate::new(&AppConfig::default().quality);
    assert!(gate.is_low_quality(""));
    assert!(gate.is_low_quality("抱歉，我不知道。"));
    assert!(!gate.is_low_quality("研发部共有3人。"));

    let long = format!("没有找到相关信息，不过{}", "研发部共有3人。".repeat(40));
    assert!(!gate.is_low_quality(&long));
}
