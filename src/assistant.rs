//! The assistant: one object wiring loaders, index builder, retriever and
//! composer to the session store.
//!
//! Both presentation layers (HTTP server and terminal chat) go through
//! [`Assistant`], so chat, upload and clear behave the same everywhere.
//! Each operation holds the session's lock for its whole duration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use kira_core::chunk::ChunkParams;
use kira_core::embedding::Embedder;
use kira_core::llm::LanguageModel;
use kira_core::models::Turn;

use crate::composer::Composer;
use crate::config::Config;
use crate::embedding::OpenAIEmbedder;
use crate::error::{KiraError, KiraResult, LoadError};
use crate::ingest::{self, IndexOutcome, IngestReport};
use crate::llm::OpenAIChatModel;
use crate::loader::DocumentKind;
use crate::prompts;
use crate::retrieval::Retriever;
use crate::session::{Session, SessionStore};

pub struct Assistant {
    composer: Composer,
    embedder: Arc<dyn Embedder>,
    params: ChunkParams,
    batch_size: usize,
    system_prompt: String,
    uploads_dir: PathBuf,
    max_upload_bytes: usize,
    sessions: SessionStore,
}

impl Assistant {
    pub fn new(
        config: &Config,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Result<Self> {
        config.validate()?;
        let retriever = Retriever::new(embedder.clone(), config.retrieval.min_score);
        Ok(Self {
            composer: Composer::new(model, retriever, config.retrieval.k),
            embedder,
            params: config.chunking.params()?,
            batch_size: config.embedding.batch_size,
            system_prompt: config.assistant.system_prompt().to_string(),
            uploads_dir: config.uploads.dir.clone(),
            max_upload_bytes: config.uploads.max_bytes,
            sessions: SessionStore::new(),
        })
    }

    /// Build an assistant backed by the OpenAI embedding and chat APIs.
    pub fn with_openai(config: &Config, api_key: &str) -> Result<Self> {
        let embedder = Arc::new(OpenAIEmbedder::new(&config.embedding, api_key)?);
        let model = Arc::new(OpenAIChatModel::new(&config.llm, api_key)?);
        tracing::info!(
            embedding_model = embedder.model_name(),
            chat_model = model.model_name(),
            "assistant ready"
        );
        Self::new(config, embedder, model)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// New session seeded with the configured system prompt.
    pub async fn create_session(&self) -> Arc<Session> {
        self.sessions.create(&self.system_prompt).await
    }

    /// Answer `text` and append the user and assistant turns on success.
    pub async fn chat(&self, session: &Session, text: &str) -> KiraResult<String> {
        if text.trim().is_empty() {
            return Err(KiraError::InvalidRequest("message must not be blank".into()));
        }
        let mut state = session.lock().await;
        let reply = self.composer.generate_response(&mut state, text).await?;
        state.append(Turn::user(text));
        state.append(Turn::assistant(reply.clone()));
        Ok(reply)
    }

    /// Persist an uploaded file, then ingest it into `session`.
    ///
    /// Unsupported extensions are rejected before anything is written.
    pub async fn upload(
        &self,
        session: &Session,
        file_name: &str,
        bytes: &[u8],
    ) -> KiraResult<IngestReport> {
        let name = ingest::sanitize_file_name(file_name)?;
        if let DocumentKind::Unsupported(ext) = DocumentKind::from_path(Path::new(&name)) {
            return Err(LoadError::Unsupported(ext).into());
        }
        let path =
            ingest::persist_upload(&self.uploads_dir, &name, bytes, self.max_upload_bytes).await?;
        self.ingest_path(session, &path).await
    }

    /// Load, chunk and index a file already on disk.
    ///
    /// A loading error leaves the session untouched. Once loading succeeds
    /// the previous index is gone either way: replaced by the new one, or
    /// dropped when embedding fails so answers fall back to conversation.
    pub async fn ingest_path(&self, session: &Session, path: &Path) -> KiraResult<IngestReport> {
        let mut state = session.lock().await;

        let prepared = ingest::prepare_chunks(path, self.params).await?;
        let segments = prepared.segments;
        let chunks = prepared.chunks.len();

        let outcome = ingest::build_index(self.embedder.as_ref(), prepared.chunks, self.batch_size)
            .await;
        let (indexed, message) = match outcome {
            IndexOutcome::Ready(index) => {
                state.replace_index(index);
                (true, prompts::UPLOAD_OK.to_string())
            }
            IndexOutcome::Unavailable { reason } => {
                state.drop_index();
                (false, format!("{} ({})", prompts::UPLOAD_FAILED, reason))
            }
        };

        let stored_as = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::info!(
            session = %session.id(),
            file = %stored_as,
            segments,
            chunks,
            indexed,
            "document ingested"
        );
        Ok(IngestReport {
            stored_as,
            segments,
            chunks,
            indexed,
            message,
        })
    }

    /// Empty transcript and memory; prompt and index are kept.
    pub async fn clear(&self, session: &Session) {
        session.lock().await.clear();
        tracing::info!(session = %session.id(), "history cleared");
    }

    pub async fn system_prompt(&self, session: &Session) -> String {
        session.lock().await.system_prompt().to_string()
    }

    /// Replace the prompt used for future responses of `session`.
    pub async fn set_system_prompt(&self, session: &Session, text: &str) {
        session.lock().await.set_system_prompt(text);
        tracing::info!(session = %session.id(), "system prompt updated");
    }
}
