//! Upload ingestion: persist, load, chunk, embed, index.
//!
//! ```text
//! bytes ──persist_upload──▶ uploads/<name> ──prepare_chunks──▶ Vec<Chunk>
//!                                                 │
//!                                       build_index(embedder)
//!                                                 ▼
//!                                IndexOutcome::Ready | Unavailable
//! ```
//!
//! Loading errors are returned to the caller. Embedding errors are not:
//! they are logged and reported as [`IndexOutcome::Unavailable`], and the
//! session carries on without document grounding.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncWriteExt;

use kira_core::chunk::{split_segments, ChunkParams};
use kira_core::embedding::Embedder;
use kira_core::index::memory::InMemoryIndex;
use kira_core::index::VectorIndex;
use kira_core::models::Chunk;

use crate::error::{KiraError, KiraResult, LoadError};
use crate::loader::DocumentKind;

/// Result of the embedding step.
pub enum IndexOutcome {
    Ready(Arc<InMemoryIndex>),
    Unavailable { reason: String },
}

impl IndexOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, IndexOutcome::Ready(_))
    }
}

/// Loaded and chunked document, not yet embedded.
#[derive(Debug)]
pub struct PreparedDocument {
    pub segments: usize,
    pub chunks: Vec<Chunk>,
}

/// What an upload produced, as reported to the user.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub stored_as: String,
    pub segments: usize,
    pub chunks: usize,
    pub indexed: bool,
    pub message: String,
}

/// Reduce a client-supplied name to its final path component.
pub fn sanitize_file_name(name: &str) -> KiraResult<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(KiraError::Upload(format!("invalid file name: {:?}", name)));
    }
    Ok(base.to_string())
}

/// `name`, `stem-1.ext`, `stem-2.ext`, ...
fn candidate_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, attempt, ext),
        _ => format!("{}-{}", name, attempt),
    }
}

/// Write `bytes` under `dir` without overwriting an existing file.
pub async fn persist_upload(
    dir: &Path,
    name: &str,
    bytes: &[u8],
    max_bytes: usize,
) -> KiraResult<PathBuf> {
    if bytes.len() > max_bytes {
        return Err(KiraError::UploadTooLarge(max_bytes));
    }
    let name = sanitize_file_name(name)?;
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        KiraError::Upload(format!("cannot create {}: {}", dir.display(), e))
    })?;

    let mut attempt = 0;
    loop {
        let path = dir.join(candidate_name(&name, attempt));
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        match opened {
            Ok(mut file) => {
                file.write_all(bytes)
                    .await
                    .map_err(|e| KiraError::Upload(format!("cannot write {}: {}", path.display(), e)))?;
                file.flush()
                    .await
                    .map_err(|e| KiraError::Upload(format!("cannot write {}: {}", path.display(), e)))?;
                tracing::info!(path = %path.display(), bytes = bytes.len(), "upload stored");
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => {
                return Err(KiraError::Upload(format!(
                    "cannot create {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }
}

/// Load and chunk `path`. Parsing runs on the blocking pool.
pub async fn prepare_chunks(path: &Path, params: ChunkParams) -> KiraResult<PreparedDocument> {
    let path = path.to_path_buf();
    let prepared = tokio::task::spawn_blocking(move || -> Result<PreparedDocument, LoadError> {
        let kind = DocumentKind::from_path(&path);
        tracing::info!("Loading {}", path.display());
        let segments = kind.load(&path)?;
        let chunks = split_segments(&segments, &params);
        Ok(PreparedDocument {
            segments: segments.len(),
            chunks,
        })
    })
    .await
    .map_err(|e| KiraError::Internal(anyhow::anyhow!("loader task failed: {}", e)))??;

    tracing::info!(
        segments = prepared.segments,
        chunks = prepared.chunks.len(),
        "document chunked"
    );
    Ok(prepared)
}

/// Embed `chunks` in batches and build an index.
///
/// Never fails: provider errors and malformed responses become
/// [`IndexOutcome::Unavailable`].
pub async fn build_index(
    embedder: &dyn Embedder,
    chunks: Vec<Chunk>,
    batch_size: usize,
) -> IndexOutcome {
    if chunks.is_empty() {
        return unavailable("document produced no chunks".to_string());
    }

    let mut vectors = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        match embedder.embed(&texts).await {
            Ok(embedded) if embedded.len() == batch.len() => vectors.extend(embedded),
            Ok(embedded) => {
                return unavailable(format!(
                    "embedding provider returned {} vectors for {} chunks",
                    embedded.len(),
                    batch.len()
                ))
            }
            Err(e) => return unavailable(format!("embedding failed: {:#}", e)),
        }
    }

    match InMemoryIndex::from_embeddings(chunks, vectors) {
        Ok(index) => {
            tracing::info!(
                chunks = index.len(),
                model = embedder.model_name(),
                "index built"
            );
            IndexOutcome::Ready(Arc::new(index))
        }
        Err(e) => unavailable(format!("{:#}", e)),
    }
}

fn unavailable(reason: String) -> IndexOutcome {
    tracing::warn!(reason = %reason, "index not available");
    IndexOutcome::Unavailable { reason }
}
