//! OpenAI chat completion client.
//!
//! [`OpenAIChatModel`] implements [`LanguageModel`] against
//! `POST /chat/completions` at the configured temperature and returns the
//! first choice's message content.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use kira_core::llm::LanguageModel;
use kira_core::models::ChatMessage;

use crate::config::LlmConfig;
use crate::http::OpenAIClient;

pub struct OpenAIChatModel {
    model: String,
    temperature: f32,
    client: OpenAIClient,
}

impl OpenAIChatModel {
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self> {
        let client = OpenAIClient::new(
            &config.base_url,
            api_key,
            config.timeout_secs,
            config.max_retries,
        )?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &LlmConfig, client: OpenAIClient) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages
                .iter()
                .map(|m| serde_json::json!({"role": m.role.as_str(), "content": m.content}))
                .collect::<Vec<_>>(),
        });
        let json = self.client.post_json("/chat/completions", &body).await?;
        let reply = parse_completion(&json)?;
        tracing::debug!(model = %self.model, messages = messages.len(), "chat completion");
        Ok(reply)
    }
}

fn parse_completion(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}
