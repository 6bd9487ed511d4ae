//! Question Orchestrator
//!
//! Top-level state machine for one question:
//! `Classifying → Dispatching → Executing → QualityCheck → (Sanitizing | Fallback → Dispatching) → Done`.
//!
//! Every path ends in an [`Answer`]. Strategies run as spawned tasks under
//! the strategy timeout; a task that misses the deadline is detached, not
//! aborted, and its result is used only if it finished by the time the
//! deadline was handled. At most one fallback strategy runs per question.
//!
//! Answers summarized from an executed query are final even when the quality
//! gate flags them: an empty result legitimately reads as "nothing found",
//! and a model answering without the data must not replace it.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use hr_copilot_core::{Classification, Conversation, Message};
use hr_copilot_llm::ModelClient;
use hr_copilot_quality_gates::{QualityGate, ResponseSanitizer};
use hr_copilot_tools::{builtin_registry, ToolRegistry, ToolStatus, DISTRIBUTION_TOOL};

use crate::models::answer::{Answer, Strategy};
use crate::models::settings::{AppConfig, PipelineSettings};
use crate::services::cache::{AnswerCache, ClassificationCache};
use crate::services::classifier::QuestionClassifier;
use crate::services::direct::{DataAvailability, DirectResponder};
use crate::services::synthesizer::{summarize_tool_result, QuerySynthesizer};
use crate::storage::RecordSnapshot;
use crate::utils::error::{AppError, AppResult};

/// Reply when a strategy fails.
pub const ERROR_MESSAGE: &str = "抱歉，处理您的请求时出现了问题。请稍后再试。";

/// Reply when a strategy exceeds its time budget.
pub const TIMEOUT_MESSAGE: &str = "抱歉，处理您的问题耗时过长，请稍后再试。";

/// Reply to an empty message.
pub const GREETING_MESSAGE: &str =
    "您好！有什么我可以帮您了解的吗？无论是查询员工信息还是部门情况，我都很乐意为您服务。";

/// One resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Tool(String),
    Synthesis,
    Direct(DataAvailability),
}

/// Primary strategy and the one fallback allowed after it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Plan {
    primary: Step,
    fallback: Step,
}

/// What running one step produced.
#[derive(Debug)]
enum StepOutcome {
    /// `grounded` marks text summarized from executed query results.
    Answered {
        text: String,
        strategy: Strategy,
        grounded: bool,
    },
    /// The step could not produce an answer; the fallback may.
    Unusable { reason: String },
    Failed(AppError),
}

/// Shared, immutable pipeline parts; cloned into spawned strategy tasks.
struct Pipeline {
    client: Arc<ModelClient>,
    snapshot: Arc<RecordSnapshot>,
    tools: Arc<ToolRegistry>,
    classifier: QuestionClassifier,
    synthesizer: QuerySynthesizer,
    direct: DirectResponder,
    gate: QualityGate,
    sanitizer: ResponseSanitizer,
    answer_cache: Arc<AnswerCache>,
}

pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    settings: PipelineSettings,
}

impl Orchestrator {
    /// Orchestrator with the built-in tools and fresh caches sized from `config`.
    pub fn new(
        config: &AppConfig,
        client: Arc<ModelClient>,
        snapshot: Arc<RecordSnapshot>,
    ) -> AppResult<Self> {
        let classification_cache =
            Arc::new(ClassificationCache::new(config.cache.classification_capacity));
        let answer_cache = Arc::new(AnswerCache::from_settings(&config.cache)?);
        Ok(Self::with_parts(
            config,
            client,
            snapshot,
            Arc::new(builtin_registry()),
            classification_cache,
            answer_cache,
        ))
    }

    /// Orchestrator over explicitly supplied tools and caches.
    pub fn with_parts(
        config: &AppConfig,
        client: Arc<ModelClient>,
        snapshot: Arc<RecordSnapshot>,
        tools: Arc<ToolRegistry>,
        classification_cache: Arc<ClassificationCache>,
        answer_cache: Arc<AnswerCache>,
    ) -> Self {
        let classifier = QuestionClassifier::new(client.clone(), classification_cache, &tools);
        let synthesizer =
            QuerySynthesizer::new(client.clone(), snapshot.clone(), tools.clone(), &config.pipeline);
        let direct = DirectResponder::new(client.clone(), snapshot.clone());
        let pipeline = Pipeline {
            client,
            snapshot,
            tools,
            classifier,
            synthesizer,
            direct,
            gate: QualityGate::new(&config.quality),
            sanitizer: ResponseSanitizer::new(&config.sanitizer),
            answer_cache,
        };
        Self {
            pipeline: Arc::new(pipeline),
            settings: config.pipeline.clone(),
        }
    }

    pub fn snapshot(&self) -> &Arc<RecordSnapshot> {
        &self.pipeline.snapshot
    }

    pub fn classification_cache(&self) -> &ClassificationCache {
        self.pipeline.classifier.cache()
    }

    pub fn answer_cache(&self) -> &AnswerCache {
        &self.pipeline.answer_cache
    }

    /// Classify a question without answering it.
    pub async fn classify(&self, question: &str) -> Classification {
        self.pipeline.classifier.classify(question).await
    }

    /// Answer the latest user message of `conversation`. Never fails.
    pub async fn answer(&self, conversation: &Conversation) -> Answer {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("answer", request_id = %request_id);
        self.answer_inner(conversation).instrument(span).await
    }

    async fn answer_inner(&self, conversation: &Conversation) -> Answer {
        let question = conversation.latest_question().unwrap_or("").trim().to_string();
        if question.is_empty() {
            return Answer::new(GREETING_MESSAGE, Strategy::Greeting);
        }
        let history = conversation.history(self.settings.history_window);

        if history.is_empty() {
            if let Some(text) = self.pipeline.answer_cache.get(&question) {
                tracing::info!("answer cache hit");
                let mut answer = Answer::new(text, Strategy::Cached);
                answer.from_cache = true;
                return answer;
            }
        }

        // Classifying
        let classification = self.pipeline.classifier.classify(&question).await;
        let plan = self.plan(&classification, &question);
        tracing::info!(
            classification = %classification,
            primary = ?plan.primary,
            fallback = ?plan.fallback,
            "strategy plan"
        );

        // Dispatching / Executing / QualityCheck / Fallback
        let mut step = plan.primary;
        let mut fallback = Some(plan.fallback);
        let mut fallback_used = false;
        let (text, strategy, passed_gate) = loop {
            match self.execute(step.clone(), &question, &history).await {
                StepOutcome::Answered {
                    text,
                    strategy,
                    grounded,
                } => {
                    let low_quality = self.pipeline.gate.is_low_quality(&text);
                    if !low_quality || grounded {
                        break (text, strategy, !low_quality);
                    }
                    match fallback.take() {
                        Some(next) => {
                            tracing::info!(strategy = %strategy, "low-quality answer, trying fallback");
                            fallback_used = true;
                            step = next;
                        }
                        None => break (text, strategy, false),
                    }
                }
                StepOutcome::Unusable { reason } => match fallback.take() {
                    Some(next) => {
                        tracing::info!(reason = %reason, "strategy produced no answer, trying fallback");
                        fallback_used = true;
                        step = next;
                    }
                    None => {
                        tracing::warn!(reason = %reason, "fallback produced no answer");
                        return self.apology(ERROR_MESSAGE, classification, fallback_used);
                    }
                },
                StepOutcome::Failed(AppError::Timeout { stage, millis }) => {
                    tracing::warn!(stage = %stage, millis, "strategy timed out");
                    return self.apology(TIMEOUT_MESSAGE, classification, fallback_used);
                }
                StepOutcome::Failed(e) => {
                    tracing::error!(error = %e, "strategy failed");
                    return self.apology(ERROR_MESSAGE, classification, fallback_used);
                }
            }
        };

        // Sanitizing
        let text = self.pipeline.sanitizer.sanitize(&text);
        if text.is_empty() {
            tracing::warn!(strategy = %strategy, "answer empty after sanitizing");
            return self.apology(ERROR_MESSAGE, classification, fallback_used);
        }

        if passed_gate && history.is_empty() && self.pipeline.answer_cache.insert(&question, &text) {
            tracing::debug!("answer cached");
        }

        tracing::info!(strategy = %strategy, fallback_used, "answer ready");
        Answer::new(text, strategy)
            .with_classification(classification)
            .with_fallback(fallback_used)
    }

    fn apology(&self, text: &str, classification: Classification, fallback_used: bool) -> Answer {
        Answer::new(text, Strategy::Apology)
            .with_classification(classification)
            .with_fallback(fallback_used)
    }

    fn plan(&self, classification: &Classification, question: &str) -> Plan {
        let direct = Step::Direct(DataAvailability::Available);
        match classification {
            // Synthesis only falls back when no query result exists.
            Classification::SqlQuery | Classification::DataAnalysis => Plan {
                primary: Step::Synthesis,
                fallback: Step::Direct(DataAvailability::Unavailable),
            },
            Classification::Visualization => Plan {
                primary: Step::Tool(DISTRIBUTION_TOOL.to_string()),
                fallback: Step::Synthesis,
            },
            Classification::Tool(name) => Plan {
                primary: Step::Tool(name.clone()),
                fallback: Step::Synthesis,
            },
            Classification::HybridQuery => {
                let ctx = self.pipeline.snapshot.tool_context();
                match self.pipeline.tools.select_for(question, &ctx) {
                    Some(tool) => Plan {
                        primary: Step::Tool(tool.name().to_string()),
                        fallback: direct,
                    },
                    None => Plan {
                        primary: direct,
                        fallback: Step::Synthesis,
                    },
                }
            }
            Classification::GeneralQuery => Plan {
                primary: direct,
                fallback: Step::Synthesis,
            },
        }
    }

    /// Run one step as its own task under the strategy timeout.
    async fn execute(&self, step: Step, question: &str, history: &[Message]) -> StepOutcome {
        let budget = Duration::from_secs(self.settings.strategy_timeout_secs);
        let pipeline = self.pipeline.clone();
        let question = question.to_string();
        let history = history.to_vec();
        let mut task = tokio::spawn(
            async move { pipeline.run_step(step, &question, &history).await }.in_current_span(),
        );

        let joined = match tokio::time::timeout(budget, &mut task).await {
            Ok(joined) => joined,
            Err(_) if task.is_finished() => {
                tracing::debug!("strategy finished as the deadline passed, using its result");
                task.await
            }
            Err(_) => {
                // dropping the handle detaches the task
                return StepOutcome::Failed(AppError::timeout("strategy", budget));
            }
        };

        joined.unwrap_or_else(|e| {
            StepOutcome::Failed(AppError::internal(format!("strategy task failed: {}", e)))
        })
    }
}

impl Pipeline {
    async fn run_step(&self, step: Step, question: &str, history: &[Message]) -> StepOutcome {
        match step {
            Step::Tool(name) => self.run_tool(&name, question, history).await,
            Step::Synthesis => {
                let (result, chain) = self.synthesizer.answer(question, history).await;
                if let Some(chain) = &chain {
                    tracing::debug!(
                        attempts = chain.attempts().len(),
                        repairs = chain.repair_count(),
                        "query chain"
                    );
                }
                match result {
                    Ok(answer) => StepOutcome::Answered {
                        text: answer.text,
                        strategy: Strategy::QuerySynthesis,
                        grounded: true,
                    },
                    Err(e) if e.is_query_failure() || matches!(e, AppError::Synthesis(_)) => {
                        StepOutcome::Unusable {
                            reason: e.to_string(),
                        }
                    }
                    Err(e) => StepOutcome::Failed(e),
                }
            }
            Step::Direct(availability) => {
                match self.direct.answer(question, history, availability).await {
                    Ok(text) => StepOutcome::Answered {
                        text,
                        strategy: Strategy::Direct,
                        grounded: false,
                    },
                    Err(e) => StepOutcome::Failed(e),
                }
            }
        }
    }

    async fn run_tool(&self, name: &str, question: &str, history: &[Message]) -> StepOutcome {
        let ctx = self.snapshot.tool_context();
        let result = self.tools.dispatch(name, question, &ctx).await;
        match result.status {
            ToolStatus::Completed => {
                match summarize_tool_result(&self.client, question, &result, history).await {
                    Ok(text) => StepOutcome::Answered {
                        text,
                        strategy: Strategy::Tool(name.to_string()),
                        grounded: false,
                    },
                    Err(e) => StepOutcome::Failed(e),
                }
            }
            ToolStatus::Skipped | ToolStatus::Failed => StepOutcome::Unusable {
                reason: format!(
                    "tool {} {:?}: {}",
                    name,
                    result.status,
                    result.error.as_deref().unwrap_or("")
                ),
            },
        }
    }
}
