//! Shared fixtures: a scripted provider with one model name per tier and a
//! small employee snapshot.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use hr_copilot::services::Orchestrator;
use hr_copilot::storage::{RecordSnapshot, SnapshotOptions, StaticProvider};
use hr_copilot::AppConfig;
use hr_copilot_llm::testing::ScriptedProvider;
use hr_copilot_llm::{ModelClient, ModelTier, TierSettings};

pub const CLASSIFIER_MODEL: &str = "classifier";
pub const CHAT_MODEL: &str = "chat";
pub const SQL_MODEL: &str = "sql";
pub const SUMMARY_MODEL: &str = "summary";

pub fn records() -> Value {
    json!([
        {"id": 1, "name": "张三", "gender": "男", "age": 30, "dept": "研发部", "position": "工程师",
         "education_level": "硕士", "salary": 20000, "hire_date": "2019-03-01"},
        {"id": 2, "name": "李四", "gender": "女", "age": 41, "dept": "研发部", "position": "高级工程师",
         "education_level": "博士", "salary": 28000, "hire_date": "2012-07-15"},
        {"id": 3, "name": "孙七", "gender": "男", "age": 26, "department": "研发部", "position": "工程师",
         "education": "本科", "salary": 15000, "hire_date": "2021-09-01"},
        {"id": 4, "name": "王五", "gender": "男", "age": 35, "department": "市场部", "position": "市场经理",
         "education": "本科", "salary": 18000, "hire_date": "2016-05-20"},
        {"id": 5, "name": "赵六", "gender": "女", "age": 29, "department": "市场部", "position": "市场专员",
         "education": "本科", "salary": 12000, "hire_date": "2020-02-10"},
        {"id": 6, "name": "周八", "gender": "女", "age": 38, "department": "综合协同部", "position": "主任",
         "education": "硕士", "salary": 22000, "hire_date": "2010-11-01"},
        {"id": 7, "name": "吴九", "gender": "男", "age": 45, "department": "综合协同部", "position": "专员",
         "education": "大专", "salary": 13000, "hire_date": "2008-04-18"},
        {"id": 8, "name": "郑十", "gender": "女", "age": 33, "department": "数字经济研究所", "position": "研究员",
         "education": "博士", "salary": 25000, "hire_date": "2018-08-08"}
    ])
}

pub const HEADCOUNT: i64 = 8;

pub fn client(provider: Arc<ScriptedProvider>) -> ModelClient {
    let tiers = [
        (ModelTier::Classifier, CLASSIFIER_MODEL),
        (ModelTier::Chat, CHAT_MODEL),
        (ModelTier::SqlSynthesis, SQL_MODEL),
        (ModelTier::Summarization, SUMMARY_MODEL),
    ];
    tiers
        .into_iter()
        .fold(ModelClient::new(provider), |client, (tier, model)| {
            let mut settings = TierSettings::for_tier(tier);
            settings.model = model.to_string();
            client.with_tier(tier, settings)
        })
        .with_retry_base_delay(Duration::from_millis(1))
}

pub async fn snapshot() -> Arc<RecordSnapshot> {
    let provider = StaticProvider::from_json(records()).unwrap();
    let snapshot = RecordSnapshot::init(Arc::new(provider), SnapshotOptions::default())
        .await
        .unwrap();
    Arc::new(snapshot)
}

pub struct Harness {
    pub provider: Arc<ScriptedProvider>,
    pub snapshot: Arc<RecordSnapshot>,
    pub orchestrator: Orchestrator,
}

pub async fn harness(provider: ScriptedProvider) -> Harness {
    harness_with(provider, AppConfig::default()).await
}

pub async fn harness_with(provider: ScriptedProvider, config: AppConfig) -> Harness {
    let provider = Arc::new(provider);
    let snapshot = snapshot().await;
    let orchestrator =
        Orchestrator::new(&config, Arc::new(client(provider.clone())), snapshot.clone()).unwrap();
    Harness {
        provider,
        snapshot,
        orchestrator,
    }
}

/// Fenced query reply.
pub fn sql(query: &str) -> String {
    format!("好的，查询如下：\n```sql\n{}\n```", query)
}
