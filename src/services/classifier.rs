//! Question Classifier
//!
//! Maps a question to a routing intent. Order, first match wins:
//! 1. classification cache (normalized question)
//! 2. structural fast rules (unit names, head-of-unit phrasing, keyword sets)
//! 3. one classifier-tier model call, defaulting to `HybridQuery`
//!
//! Both rule and model outcomes are cached. A provider failure yields the
//! default label without caching it, so the next ask tries the model again.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;

use hr_copilot_core::{Classification, Message};
use hr_copilot_llm::{ModelClient, ModelTier};
use hr_copilot_tools::{ToolRegistry, KNOWN_UNITS};

use crate::services::cache::ClassificationCache;
use crate::utils::error::{AppError, AppResult};

/// Label used when the model gives no usable answer.
pub const DEFAULT_CLASSIFICATION: Classification = Classification::HybridQuery;

const SQL_KEYWORDS: &[&str] = &[
    "多少", "平均", "查询", "统计", "人数", "比例", "百分比", "总数", "查找", "哪些", "列出",
    "平均年龄", "平均工资", "平均薪资", "几个", "几人", "谁是", "入职", "年份", "年龄", "毕业",
    "学历", "大学", "本科", "硕士", "博士", "学位", "专业",
];

const VISUALIZATION_KEYWORDS: &[&str] = &[
    "图表", "图形", "可视化", "柱状图", "饼图", "折线图", "直方图", "散点图", "画一个", "展示一下",
    "看一下", "分布图", "趋势图", "展示",
];

/// Suppresses the visualization rule.
const NO_CHART_PHRASE: &str = "不需要图";

const ANALYSIS_KEYWORDS: &[&str] = &[
    "分析", "预测", "趋势", "相关性", "关联", "影响因素", "对比", "增长", "下降", "变化", "模式",
    "特征", "总结", "建议",
];

struct FastRules {
    known_units: Option<Regex>,
    generic_unit: Option<Regex>,
    head_of_unit: Option<Regex>,
}

fn fast_rules() -> &'static FastRules {
    static RULES: OnceLock<FastRules> = OnceLock::new();
    RULES.get_or_init(|| {
        let alternation = KNOWN_UNITS
            .iter()
            .map(|u| regex::escape(u))
            .collect::<Vec<_>>()
            .join("|");
        FastRules {
            known_units: Regex::new(&format!("({})", alternation)).ok(),
            generic_unit: Regex::new(r"(\w+部|\w+所|\w+中心)").ok(),
            head_of_unit: Regex::new(r"(谁是|谁担任|谁负责|谁主管|谁分管)(.*?)(负责人|部长|所长|主任|主管|的)").ok(),
        }
    })
}

/// Classify with the structural rules alone.
pub fn classify_by_rules(question: &str) -> Option<Classification> {
    let rules = fast_rules();
    let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(question));
    let contains_any = |words: &[&str]| words.iter().any(|w| question.contains(w));

    if matches(&rules.known_units) || matches(&rules.generic_unit) || matches(&rules.head_of_unit) {
        return Some(Classification::SqlQuery);
    }
    if contains_any(SQL_KEYWORDS) {
        return Some(Classification::SqlQuery);
    }
    if !question.contains(NO_CHART_PHRASE) && contains_any(VISUALIZATION_KEYWORDS) {
        return Some(Classification::Visualization);
    }
    if contains_any(ANALYSIS_KEYWORDS) {
        return Some(Classification::DataAnalysis);
    }
    None
}

/// Cache-checked, rule-first, model-backed question classifier.
pub struct QuestionClassifier {
    client: Arc<ModelClient>,
    cache: Arc<ClassificationCache>,
    tool_names: Vec<String>,
    tool_lines: String,
}

impl QuestionClassifier {
    pub fn new(client: Arc<ModelClient>, cache: Arc<ClassificationCache>, tools: &ToolRegistry) -> Self {
        Self {
            client,
            cache,
            tool_names: tools.names(),
            tool_lines: tools.describe(),
        }
    }

    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }

    /// Classify a question. Never fails; never waits longer than the
    /// classifier tier's timeout.
    pub async fn classify(&self, question: &str) -> Classification {
        let question = question.trim();
        if question.is_empty() {
            return Classification::GeneralQuery;
        }

        if let Some(cached) = self.cache.get(question) {
            tracing::debug!(classification = %cached, "classification cache hit");
            return cached;
        }

        if let Some(classification) = classify_by_rules(question) {
            tracing::debug!(classification = %classification, source = "rules", "question classified");
            self.cache.insert(question, classification.clone());
            return classification;
        }

        match self.classify_with_model(question).await {
            Ok(classification) => {
                tracing::debug!(classification = %classification, source = "model", "question classified");
                self.cache.insert(question, classification.clone());
                classification
            }
            Err(e) => {
                tracing::warn!(error = %e, "model classification failed, using default");
                DEFAULT_CLASSIFICATION
            }
        }
    }

    async fn classify_with_model(&self, question: &str) -> AppResult<Classification> {
        let budget = Duration::from_secs(self.client.settings(ModelTier::Classifier).timeout_secs);
        let call = self.client.complete(self.prompt(question), ModelTier::Classifier);
        let reply = tokio::time::timeout(budget, call)
            .await
            .map_err(|_| AppError::timeout("classification", budget))?
            .map_err(|e| AppError::classification(e.to_string()))?;

        Ok(Classification::from_model_reply(&reply, &self.tool_names).unwrap_or_else(|| {
            tracing::debug!(reply = %reply, "unrecognized classification reply");
            DEFAULT_CLASSIFICATION
        }))
    }

    fn prompt(&self, question: &str) -> Vec<Message> {
        let mut system = String::from(
            "你是一个问题分类器，负责判断用户关于公司员工信息的问题应该如何处理。\n\
             只输出下列标签中的一个，不要输出任何其他内容：\n\
             SQL_QUERY - 需要查询员工数据库的具体数据（人数、名单、平均值等）\n\
             VISUALIZATION - 需要用图表展示数据\n\
             DATA_ANALYSIS - 需要对数据做趋势、对比或原因分析\n\
             HYBRID_QUERY - 既涉及数据又需要解释说明\n\
             GENERAL_QUERY - 与员工数据无关的一般性问题或闲聊\n",
        );
        if !self.tool_names.is_empty() {
            system.push_str("TOOL:<工具名> - 问题可以直接由以下某个工具回答：\n");
            system.push_str(&self.tool_lines);
            system.push('\n');
        }
        vec![
            Message::system(system),
            Message::user(format!("问题：{}\n标签：", question)),
        ]
    }
}
