//! Response composition.
//!
//! Every query gets a conversational answer: system prompt, memory buffer,
//! then the query. When the session has an index and retrieval finds
//! relevant chunks, a grounded answer is produced first from a prompt that
//! stuffs those chunks above the question, and the two answers are joined
//! with [`SEPARATOR`].
//!
//! Memory only records the conversational exchange, and only after every
//! model call for the query has succeeded.

use std::sync::Arc;

use kira_core::llm::LanguageModel;
use kira_core::prompt::{conversation_messages, grounded_messages};

use crate::error::{KiraError, KiraResult};
use crate::retrieval::Retriever;
use crate::session::SessionState;

/// Placed between the grounded and conversational answers.
pub const SEPARATOR: &str = "\n\n---\n\n";

#[derive(Clone)]
pub struct Composer {
    model: Arc<dyn LanguageModel>,
    retriever: Retriever,
    k: usize,
}

impl Composer {
    pub fn new(model: Arc<dyn LanguageModel>, retriever: Retriever, k: usize) -> Self {
        Self {
            model,
            retriever,
            k,
        }
    }

    pub async fn generate_response(
        &self,
        state: &mut SessionState,
        query: &str,
    ) -> KiraResult<String> {
        let conversation =
            conversation_messages(state.system_prompt(), state.memory().history(), query);
        let hits = self.retriever.retrieve(state.index(), query, self.k).await?;

        let grounded = if hits.is_empty() {
            None
        } else {
            let passages: Vec<&str> = hits.iter().map(|h| h.text.as_str()).collect();
            tracing::debug!(passages = passages.len(), "grounded call");
            let answer = self
                .model
                .complete(&grounded_messages(&passages, query))
                .await
                .map_err(llm_error)?;
            Some(answer)
        };

        tracing::debug!(history = state.memory().exchanges(), "conversational call");
        let conversational = self
            .model
            .complete(&conversation)
            .await
            .map_err(llm_error)?;

        state.memory_mut().save_context(query, &conversational);

        Ok(match grounded {
            Some(grounded) => format!("{}{}{}", grounded, SEPARATOR, conversational),
            None => conversational,
        })
    }
}

fn llm_error(err: anyhow::Error) -> KiraError {
    tracing::warn!(error = %err, "language model call failed");
    KiraError::Llm(format!("{:#}", err))
}
