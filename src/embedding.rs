//! OpenAI embedding provider.
//!
//! [`OpenAIEmbedder`] implements [`Embedder`] against `POST /embeddings`,
//! one request per call through the retrying client in [`crate::http`].
//! Batching is the caller's job (see [`crate::ingest::build_index`]).
//!
//! The response's `data[]` entries carry an `index`; vectors are returned
//! in that order so they line up with the input texts even if the API
//! reorders them.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use kira_core::embedding::Embedder;

use crate::config::EmbeddingConfig;
use crate::http::OpenAIClient;

pub struct OpenAIEmbedder {
    model: String,
    client: OpenAIClient,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self> {
        let client = OpenAIClient::new(
            &config.base_url,
            api_key,
            config.timeout_secs,
            config.max_retries,
        )?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: &EmbeddingConfig, client: OpenAIClient) -> Self {
        Self {
            model: config.model.clone(),
            client,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let json = self.client.post_json("/embeddings", &body).await?;
        let vectors = parse_openai_response(&json)?;
        if vectors.len() != texts.len() {
            bail!(
                "OpenAI returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            );
        }
        tracing::debug!(model = %self.model, count = vectors.len(), "embedded texts");
        Ok(vectors)
    }
}

/// Extract `data[].embedding`, ordered by `data[].index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}
