//! Tiered Model Client
//!
//! `complete(messages, tier)` is the single call shape the pipeline uses: the
//! tier selects the model and sampling parameters, and every call is wrapped
//! in a per-attempt timeout with retry on transient failure.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::provider::LlmProvider;
use crate::retry::{with_retry, RetryPolicy, RETRY_BASE_DELAY_MS};
use crate::types::{LlmRequestOptions, LlmResult, Message, ModelTier, TierSettings};

/// Provider plus per-tier settings.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn LlmProvider>,
    tiers: HashMap<ModelTier, TierSettings>,
    retry_base_delay: Duration,
}

impl ModelClient {
    /// Client with the default settings for every tier.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let tiers = ModelTier::ALL
            .iter()
            .map(|tier| (*tier, TierSettings::for_tier(*tier)))
            .collect();
        Self {
            provider,
            tiers,
            retry_base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
        }
    }

    /// Replace the settings of one tier.
    pub fn with_tier(mut self, tier: ModelTier, settings: TierSettings) -> Self {
        self.tiers.insert(tier, settings);
        self
    }

    /// Shorten the backoff base delay (tests).
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn settings(&self, tier: ModelTier) -> TierSettings {
        self.tiers
            .get(&tier)
            .cloned()
            .unwrap_or_else(|| TierSettings::for_tier(tier))
    }

    /// Complete a conversation on the given tier and return the response text.
    pub async fn complete(&self, messages: Vec<Message>, tier: ModelTier) -> LlmResult<String> {
        let settings = self.settings(tier);
        self.complete_with(messages, tier, &settings).await
    }

    /// Complete with explicit settings instead of the tier's configured ones.
    pub async fn complete_with(
        &self,
        messages: Vec<Message>,
        tier: ModelTier,
        settings: &TierSettings,
    ) -> LlmResult<String> {
        let options = LlmRequestOptions::from(settings);
        let policy = RetryPolicy::new(settings.retry_count).with_base_delay(self.retry_base_delay);
        let timeout = Duration::from_secs(settings.timeout_secs);
        let label = tier.as_str();

        tracing::debug!(
            tier = label,
            model = %options.model,
            messages = messages.len(),
            "model completion"
        );

        let response = with_retry(&policy, timeout, label, || {
            self.provider
                .send_message(messages.clone(), options.clone())
        })
        .await?;

        Ok(response.text().trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedProvider, ScriptedReply};
    use crate::types::LlmError;

    fn client(provider: Arc<ScriptedProvider>) -> ModelClient {
        ModelClient::new(provider).with_retry_base_delay(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_complete_uses_tier_settings() {
        let provider = Arc::new(ScriptedProvider::new().reply("sql-model", "  SELECT 1  "));
        let mut sql = TierSettings::for_tier(ModelTier::SqlSynthesis);
        sql.model = "sql-model".to_string();
        let client = client(provider.clone()).with_tier(ModelTier::SqlSynthesis, sql);

        let text = client
            .complete(vec![Message::user("count")], ModelTier::SqlSynthesis)
            .await
            .unwrap();
        assert_eq!(text, "SELECT 1");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].options.model, "sql-model");
        assert_eq!(calls[0].options.max_tokens, 2048);
    }

    #[tokio::test]
    async fn test_complete_retries_server_errors() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .push_reply(
                    "m",
                    ScriptedReply::Error(LlmError::ServerError {
                        message: "busy".into(),
                        status: Some(502),
                    }),
                )
                .reply("m", "ok"),
        );
        let mut chat = TierSettings::for_tier(ModelTier::Chat);
        chat.model = "m".to_string();
        let client = client(provider.clone()).with_tier(ModelTier::Chat, chat);

        let text = client.complete(vec![Message::user("hi")], ModelTier::Chat).await;
        assert_eq!(text.unwrap(), "ok");
        assert_eq!(provider.calls_for("m"), 2);
    }

    #[tokio::test]
    async fn test_complete_does_not_retry_client_errors() {
        let provider = Arc::new(ScriptedProvider::new().push_reply(
            "m",
            ScriptedReply::Error(LlmError::InvalidRequest {
                message: "bad".into(),
            }),
        ));
        let mut chat = TierSettings::for_tier(ModelTier::Chat);
        chat.model = "m".to_string();
        let client = client(provider.clone()).with_tier(ModelTier::Chat, chat);

        let result = client.complete(vec![Message::user("hi")], ModelTier::Chat).await;
        assert!(result.is_err());
        assert_eq!(provider.calls_for("m"), 1);
    }
}
