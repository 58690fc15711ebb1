//! Retrying JSON client for the OpenAI REST API.
//!
//! Both the embedding and chat clients go through [`OpenAIClient::post_json`],
//! which retries rate limits (429), server errors (5xx) and network errors
//! with exponential backoff (1s, 2s, 4s, ... capped at 32s). Any other
//! client error fails immediately.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    backoff_unit: Duration,
}

impl OpenAIClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout_secs: u64,
        max_retries: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_retries,
            backoff_unit: Duration::from_secs(1),
        })
    }

    /// Shrink the backoff delay. Used by tests against a local mock server.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// POST `body` to `{base_url}{path}` and return the decoded JSON response.
    pub async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_unit * (1u32 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, url = %url, "retrying OpenAI request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        tracing::warn!(%status, "OpenAI request failed, will retry");
                        last_err = Some(anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "OpenAI request failed, will retry");
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("OpenAI request failed after retries")))
    }
}
