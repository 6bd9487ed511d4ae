//! Query Synthesizer
//!
//! Turns a question into a read-only query over the record snapshot, runs
//! it, and summarizes the rows conversationally.
//!
//! ## Flow
//! 1. schema-aware prompt on the sql-synthesis tier
//! 2. parse the reply: query, tool call, or nothing recognizable
//! 3. nothing recognizable: one clarification prompt, then a rule-based query
//! 4. validate, execute; on rejection or execution error, bounded repair
//! 5. summarize the rows on the summarization tier (empty sets included)

pub mod fallback_rules;
pub mod prompt;
pub mod validator;

use std::sync::Arc;

use serde::Serialize;

use hr_copilot_core::{Message, RowSet};
use hr_copilot_llm::{ModelClient, ModelTier};
use hr_copilot_tools::{
    parse_model_output, ParsedOutput, Recognized, ToolParams, ToolRegistry, ToolResult,
};

use crate::models::settings::PipelineSettings;
use crate::storage::RecordSnapshot;
use crate::utils::error::{AppError, AppResult};

pub use fallback_rules::{quote_literal, rule_based_query};
pub use validator::{validate_query, FORBIDDEN_KEYWORDS};

/// Where a candidate query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    Model,
    Clarification,
    Repair,
    Rule,
}

/// One candidate query, linked to the repair that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedQuery {
    /// Text the query was taken from (the model reply, or the rule query).
    pub raw: String,
    pub query: String,
    pub source: QuerySource,
    /// Whether the query passed the read-only validator.
    pub valid: bool,
    /// Rejection or execution error, if the query did not produce rows.
    pub error: Option<String>,
    pub repaired: Option<Box<SynthesizedQuery>>,
}

impl SynthesizedQuery {
    /// Link a list of attempts, oldest first, into a chain.
    fn chain(attempts: Vec<SynthesizedQuery>) -> Option<SynthesizedQuery> {
        attempts.into_iter().rev().fold(None, |next, mut attempt| {
            attempt.repaired = next.map(Box::new);
            Some(attempt)
        })
    }

    /// Attempts in order, starting with this one.
    pub fn attempts(&self) -> Vec<&SynthesizedQuery> {
        let mut out = vec![self];
        let mut current = self;
        while let Some(next) = current.repaired.as_deref() {
            out.push(next);
            current = next;
        }
        out
    }

    /// The last query of the chain.
    pub fn last(&self) -> &SynthesizedQuery {
        let mut current = self;
        while let Some(next) = current.repaired.as_deref() {
            current = next;
        }
        current
    }

    /// Number of repairs made after the first attempt.
    pub fn repair_count(&self) -> usize {
        self.attempts()
            .iter()
            .filter(|a| a.source == QuerySource::Repair)
            .count()
    }
}

/// What a synthesis run produced before summarization.
#[derive(Debug, Clone)]
pub enum SynthesisResult {
    Rows(RowSet),
    /// The model asked for a tool instead of writing a query.
    Tool(ToolResult),
}

/// Result plus the query chain that led to it.
#[derive(Debug)]
pub struct QueryOutcome {
    pub chain: Option<SynthesizedQuery>,
    pub result: AppResult<SynthesisResult>,
}

/// Conversational answer produced by the synthesizer.
#[derive(Debug)]
pub struct SynthesizedAnswer {
    pub text: String,
    /// Rows the answer was based on; `None` when a tool answered instead.
    pub rows: Option<RowSet>,
}

/// Query synthesis against the record snapshot.
pub struct QuerySynthesizer {
    client: Arc<ModelClient>,
    snapshot: Arc<RecordSnapshot>,
    tools: Arc<ToolRegistry>,
    max_repair_attempts: u32,
    summary_rows: usize,
}

impl QuerySynthesizer {
    pub fn new(
        client: Arc<ModelClient>,
        snapshot: Arc<RecordSnapshot>,
        tools: Arc<ToolRegistry>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            client,
            snapshot,
            tools,
            max_repair_attempts: settings.max_repair_attempts,
            summary_rows: settings.summary_rows,
        }
    }

    /// Synthesize, run and summarize.
    ///
    /// A query failure comes back as `Err` next to the chain; nothing
    /// data-bearing is produced for a failed or rejected query.
    pub async fn answer(
        &self,
        question: &str,
        history: &[Message],
    ) -> (AppResult<SynthesizedAnswer>, Option<SynthesizedQuery>) {
        let QueryOutcome { chain, result } = self.synthesize_and_run(question, history).await;
        let answer = match result {
            Ok(SynthesisResult::Rows(rows)) => {
                let summary = self.summarize_rows(question, &rows, history).await;
                summary.map(|text| SynthesizedAnswer {
                    text,
                    rows: Some(rows),
                })
            }
            Ok(SynthesisResult::Tool(result)) => {
                let summary = summarize_tool_result(&self.client, question, &result, history).await;
                summary.map(|text| SynthesizedAnswer { text, rows: None })
            }
            Err(e) => Err(e),
        };
        (answer, chain)
    }

    /// Steps 1-4: obtain a valid query and execute it.
    pub async fn synthesize_and_run(&self, question: &str, history: &[Message]) -> QueryOutcome {
        let mut attempts = Vec::new();
        let result = self.run_attempts(question, history, &mut attempts).await;
        QueryOutcome {
            chain: SynthesizedQuery::chain(attempts),
            result,
        }
    }

    async fn run_attempts(
        &self,
        question: &str,
        history: &[Message],
        attempts: &mut Vec<SynthesizedQuery>,
    ) -> AppResult<SynthesisResult> {
        let departments = self.snapshot.tool_context().departments().to_vec();
        let schema = self.snapshot.schema();

        let messages = prompt::synthesis_messages(
            schema,
            &departments,
            &self.tools.describe(),
            question,
            history,
        );
        let reply = self.complete_sql(messages).await?;

        let (mut query, mut raw, mut source) = match parse_model_output(&reply) {
            ParsedOutput::Recognized(Recognized::Query(q)) => (q, reply, QuerySource::Model),
            ParsedOutput::Recognized(Recognized::ToolCall(call)) => {
                return self.run_tool_call(call.tool, call.params).await;
            }
            ParsedOutput::Unrecognized(text) => {
                tracing::debug!("no query in synthesis reply, asking for clarification");
                let messages =
                    prompt::clarification_messages(schema, &departments, question, &text);
                let reply = self.complete_sql(messages).await?;
                match parse_model_output(&reply) {
                    ParsedOutput::Recognized(Recognized::Query(q)) => {
                        (q, reply, QuerySource::Clarification)
                    }
                    ParsedOutput::Recognized(Recognized::ToolCall(call)) => {
                        return self.run_tool_call(call.tool, call.params).await;
                    }
                    ParsedOutput::Unrecognized(_) => {
                        match rule_based_query(question, schema, &departments) {
                            Some(q) => {
                                tracing::info!(query = %q, "using rule-based query");
                                (q.clone(), q, QuerySource::Rule)
                            }
                            None => {
                                return Err(AppError::synthesis(
                                    "no query could be extracted from the model reply",
                                ))
                            }
                        }
                    }
                }
            }
        };

        let mut repairs = 0u32;
        loop {
            let validated = validate_query(&query);
            let valid = validated.is_ok();
            let executed = match validated {
                Ok(sql) => self.snapshot.run_query(&sql).await,
                Err(e) => Err(e),
            };

            match executed {
                Ok(rows) => {
                    tracing::info!(
                        rows = rows.len(),
                        total = rows.total_rows,
                        repairs,
                        "query executed"
                    );
                    attempts.push(SynthesizedQuery {
                        raw,
                        query,
                        source,
                        valid,
                        error: None,
                        repaired: None,
                    });
                    return Ok(SynthesisResult::Rows(rows));
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt = repairs + 1, valid, "query failed");
                    attempts.push(SynthesizedQuery {
                        raw,
                        query: query.clone(),
                        source,
                        valid,
                        error: Some(e.to_string()),
                        repaired: None,
                    });
                    if !e.is_query_failure() || repairs >= self.max_repair_attempts {
                        return Err(e);
                    }

                    repairs += 1;
                    let messages = prompt::repair_messages(
                        schema,
                        &departments,
                        question,
                        &query,
                        &e.to_string(),
                    );
                    let reply = self.complete_sql(messages).await?;
                    match parse_model_output(&reply) {
                        ParsedOutput::Recognized(Recognized::Query(q)) => {
                            query = q;
                            raw = reply;
                            source = QuerySource::Repair;
                        }
                        _ => {
                            tracing::warn!("repair reply contained no query");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn complete_sql(&self, messages: Vec<Message>) -> AppResult<String> {
        Ok(self.client.complete(messages, ModelTier::SqlSynthesis).await?)
    }

    async fn run_tool_call(
        &self,
        tool: String,
        params: ToolParams,
    ) -> AppResult<SynthesisResult> {
        tracing::info!(tool = %tool, "synthesis reply requested a tool");
        let ctx = self.snapshot.tool_context();
        let result = self.tools.dispatch_with(&tool, params, &ctx).await;
        if result.is_success() {
            Ok(SynthesisResult::Tool(result))
        } else {
            Err(AppError::synthesis(format!(
                "tool call {} did not complete: {}",
                tool,
                result.error.as_deref().unwrap_or("unknown error")
            )))
        }
    }

    /// Step 5: conversational summary, always requested, even for no rows.
    pub async fn summarize_rows(
        &self,
        question: &str,
        rows: &RowSet,
        history: &[Message],
    ) -> AppResult<String> {
        let messages = prompt::row_summary_messages(question, rows, self.summary_rows, history);
        Ok(self.client.complete(messages, ModelTier::Summarization).await?)
    }
}

/// Conversational answer for a completed tool call, on the chat tier.
pub async fn summarize_tool_result(
    client: &ModelClient,
    question: &str,
    result: &ToolResult,
    history: &[Message],
) -> AppResult<String> {
    let messages = prompt::tool_summary_messages(question, result, history);
    Ok(client.complete(messages, ModelTier::Chat).await?)
}
