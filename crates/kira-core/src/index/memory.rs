//! In-memory [`VectorIndex`] implementation.
//!
//! Stores `(chunk, vector)` pairs in chunk order. Search is brute-force
//! cosine similarity over every stored vector, which is plenty for the
//! single-document indexes a chat session holds.

use std::cmp::Ordering;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{Chunk, SearchHit};

use super::VectorIndex;

struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

pub struct InMemoryIndex {
    entries: Vec<IndexedChunk>,
    dims: usize,
}

impl InMemoryIndex {
    /// Pair each chunk with its vector.
    ///
    /// Fails when the counts differ, when there is nothing to index, or
    /// when the vectors do not all share one dimensionality.
    pub fn from_embeddings(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != vectors.len() {
            bail!(
                "embedding count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }
        let Some(dims) = vectors.first().map(|v| v.len()) else {
            bail!("cannot build an index from zero chunks");
        };
        if dims == 0 {
            bail!("embedding vectors must not be empty");
        }
        if let Some(bad) = vectors.iter().position(|v| v.len() != dims) {
            bail!(
                "embedding {} has {} dims, expected {}",
                bad,
                vectors[bad].len(),
                dims
            );
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedChunk { chunk, vector })
            .collect();

        Ok(Self { entries, dims })
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        if query_vec.len() != self.dims {
            bail!(
                "query vector has {} dims, index has {}",
                query_vec.len(),
                self.dims
            );
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|e| SearchHit {
                chunk_index: e.chunk.chunk_index,
                text: e.chunk.text.clone(),
                source: e.chunk.metadata.source.clone(),
                position: e.chunk.metadata.position,
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}
