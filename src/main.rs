//! HR Copilot command line: one question per line on stdin, one answer per
//! question on stdout. Logs go to stderr.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use hr_copilot::services::Orchestrator;
use hr_copilot::storage::{ConfigService, JsonFileProvider, RecordSnapshot, SnapshotOptions};
use hr_copilot::utils::paths::default_records_path;
use hr_copilot::AppConfig;
use hr_copilot_core::{Conversation, Message};
use hr_copilot_llm::{ModelClient, ModelTier, OpenAICompatibleProvider};

const CLASSIFICATION_CACHE_FILE: &str = "classification_cache.json";
const ANSWER_CACHE_FILE: &str = "answer_cache.json";

#[derive(Parser, Debug)]
#[command(name = "hr-copilot", version, about = "Ask questions about employee records")]
struct Cli {
    /// Configuration file (default: ~/.hr-copilot/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Employee records, a JSON array of objects
    #[arg(long)]
    records: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let service = match &cli.config {
        Some(path) => ConfigService::from_path(path),
        None => ConfigService::new(),
    }
    .context("loading configuration")?;
    let mut config = service.into_config();
    if let Some(records) = &cli.records {
        config.records.path = Some(records.clone());
    }
    Ok(config)
}

fn build_client(config: &AppConfig) -> Result<ModelClient> {
    let provider = OpenAICompatibleProvider::new(config.llm.provider_config())
        .context("creating model provider")?;
    let client = ModelTier::ALL
        .iter()
        .fold(ModelClient::new(Arc::new(provider)), |client, tier| {
            client.with_tier(*tier, config.llm.tiers.get(*tier).clone())
        });
    Ok(client)
}

fn load_caches(orchestrator: &Orchestrator, dir: &Path) {
    let classification = dir.join(CLASSIFICATION_CACHE_FILE);
    if classification.exists() {
        match orchestrator.classification_cache().load_from(&classification) {
            Ok(n) => tracing::info!(entries = n, "classification cache loaded"),
            Err(e) => tracing::warn!(error = %e, "classification cache not loaded"),
        }
    }
    let answers = dir.join(ANSWER_CACHE_FILE);
    if answers.exists() {
        match orchestrator.answer_cache().load_from(&answers) {
            Ok(n) => tracing::info!(entries = n, "answer cache loaded"),
            Err(e) => tracing::warn!(error = %e, "answer cache not loaded"),
        }
    }
}

fn save_caches(orchestrator: &Orchestrator, dir: &Path) {
    if let Err(e) = orchestrator
        .classification_cache()
        .save_to(&dir.join(CLASSIFICATION_CACHE_FILE))
    {
        tracing::warn!(error = %e, "classification cache not saved");
    }
    if let Err(e) = orchestrator.answer_cache().save_to(&dir.join(ANSWER_CACHE_FILE)) {
        tracing::warn!(error = %e, "answer cache not saved");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let records_path = match &config.records.path {
        Some(path) => path.clone(),
        None => default_records_path()?,
    };

    let client = build_client(&config)?;
    let provider = Arc::new(JsonFileProvider::new(&records_path));
    let snapshot = RecordSnapshot::init(provider, SnapshotOptions::from(&config.pipeline))
        .await
        .with_context(|| format!("loading records from {}", records_path.display()))?;
    let orchestrator = Orchestrator::new(&config, Arc::new(client), Arc::new(snapshot))?;

    if let Some(dir) = &config.cache.persist_dir {
        load_caches(&orchestrator, dir);
    }

    let window = config.pipeline.history_window;
    let mut conversation = Conversation::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("请输入问题（:refresh 重新加载数据，:reset 清空对话，:quit 退出）");
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" => break,
            ":reset" => {
                conversation = Conversation::default();
                eprintln!("对话已清空");
            }
            ":refresh" => match orchestrator.snapshot().refresh().await {
                Ok(rows) => eprintln!("已重新加载 {} 条记录", rows),
                Err(e) => eprintln!("重新加载失败：{}", e),
            },
            question => {
                conversation.push(Message::user(question));
                let answer = orchestrator.answer(&conversation).await;
                println!("{}", answer.text);
                conversation.push(Message::assistant(answer.text));
                conversation.truncate_front(window + 1);
            }
        }
    }

    if let Some(dir) = &config.cache.persist_dir {
        save_caches(&orchestrator, dir);
    }
    orchestrator.snapshot().shutdown();
    Ok(())
}
