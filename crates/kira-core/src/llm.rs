//! Language-model trait.
//!
//! The composer talks to the model only through [`LanguageModel`], so tests
//! can swap in scripted fakes and the app crate can plug in the OpenAI
//! chat-completions client.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ChatMessage;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Produce the assistant reply for an ordered list of messages.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}
