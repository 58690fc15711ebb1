//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the only way retrieval touches stored
//! embeddings, so the in-memory index can be swapped for an external vector
//! store without changing the retriever or composer.
//!
//! An index is built once from an ordered chunk list and never mutated.
//! Replacing a session's document means building a new index and dropping
//! the old one; there is no merge.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::SearchHit;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Number of indexed chunks.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Up to `limit` hits ordered by similarity (desc), ties by chunk index.
    async fn search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<SearchHit>>;
}
