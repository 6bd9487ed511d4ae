//! Scripted Provider
//!
//! An in-process `LlmProvider` that answers from per-model reply queues and
//! records every request. Used by unit and integration tests to drive the
//! pipeline without network access.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::provider::LlmProvider;
use crate::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Error(LlmError),
    /// Sleep, then produce the inner reply.
    Delayed(Duration, Box<ScriptedReply>),
}

/// A request the provider received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub options: LlmRequestOptions,
}

impl RecordedCall {
    /// All message contents joined, for substring assertions.
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Provider answering from queues keyed by model name.
///
/// When a model's queue is empty the `otherwise` reply (if any) is used for
/// every further call; with no fallback the call fails with `LlmError::Other`.
#[derive(Default)]
pub struct ScriptedProvider {
    queues: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
    fallback: Mutex<Option<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text reply for `model`.
    pub fn reply(self, model: &str, text: &str) -> Self {
        self.push_reply(model, ScriptedReply::Text(text.to_string()))
    }

    /// Queue an error for `model`.
    pub fn fail(self, model: &str, err: LlmError) -> Self {
        self.push_reply(model, ScriptedReply::Error(err))
    }

    /// Queue a text reply for `model` that arrives after `delay`.
    pub fn delayed(self, model: &str, delay: Duration, text: &str) -> Self {
        self.push_reply(
            model,
            ScriptedReply::Delayed(delay, Box::new(ScriptedReply::Text(text.to_string()))),
        )
    }

    pub fn push_reply(self, model: &str, reply: ScriptedReply) -> Self {
        self.enqueue(model, reply);
        self
    }

    /// Reply used once a model's queue is exhausted.
    pub fn otherwise(self, reply: ScriptedReply) -> Self {
        *self.fallback.lock().unwrap_or_else(|e| e.into_inner()) = Some(reply);
        self
    }

    /// Queue a reply on a shared provider.
    pub fn enqueue(&self, model: &str, reply: ScriptedReply) {
        self.queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(model.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_for(&self, model: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|c| c.options.model == model)
            .count()
    }

    fn next_reply(&self, model: &str) -> Option<ScriptedReply> {
        let queued = self
            .queues
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(model)
            .and_then(|q| q.pop_front());
        queued.or_else(|| {
            self.fallback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
        })
    }
}

async fn resolve(reply: ScriptedReply, model: &str) -> LlmResult<LlmResponse> {
    let mut current = reply;
    loop {
        match current {
            ScriptedReply::Text(text) => {
                return Ok(LlmResponse {
                    content: Some(text),
                    finish_reason: Some("stop".to_string()),
                    model: model.to_string(),
                    ..Default::default()
                })
            }
            ScriptedReply::Error(err) => return Err(err),
            ScriptedReply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                current = *inner;
            }
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let model = options.model.clone();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall { messages, options });

        match self.next_reply(&model) {
            Some(reply) => resolve(reply, &model).await,
            None => Err(LlmError::Other {
                message: format!("no scripted reply for model {}", model),
            }),
        }
    }
}
