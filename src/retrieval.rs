//! Query-time retrieval over a session's index.
//!
//! The query is embedded with the same [`Embedder`] that built the index,
//! then the index is searched. Hits below `min_score` are dropped, as are
//! hits whose text repeats a better-ranked hit, and at most `k` texts
//! are returned in relevance order.

use std::collections::HashSet;
use std::sync::Arc;

use kira_core::embedding::Embedder;
use kira_core::index::VectorIndex;
use kira_core::models::SearchHit;

use crate::error::{KiraError, KiraResult};

#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    min_score: f32,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, min_score: f32) -> Self {
        Self {
            embedder,
            min_score,
        }
    }

    /// Up to `k` relevant hits, most relevant first.
    ///
    /// No index means no hits. A failure to embed the query or to search is
    /// logged and also yields no hits, so the caller can still answer
    /// conversationally.
    pub async fn retrieve(
        &self,
        index: Option<&dyn VectorIndex>,
        query: &str,
        k: usize,
    ) -> KiraResult<Vec<SearchHit>> {
        if k == 0 {
            return Err(KiraError::InvalidRequest("k must be >= 1".into()));
        }
        let Some(index) = index else {
            return Ok(Vec::new());
        };
        if index.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = match self.embedder.embed_query(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed, answering without documents");
                return Ok(Vec::new());
            }
        };

        // Over-fetch so the cutoff and dedup can still leave k hits.
        let candidates = match index.search(&query_vec, k.saturating_mul(2)).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "index search failed, answering without documents");
                return Ok(Vec::new());
            }
        };

        let hits = self.filter(candidates, k);
        tracing::debug!(k, returned = hits.len(), "retrieved chunks");
        Ok(hits)
    }

    fn filter(&self, candidates: Vec<SearchHit>, k: usize) -> Vec<SearchHit> {
        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|hit| hit.score >= self.min_score)
            .filter(|hit| seen.insert(hit.text.clone()))
            .take(k)
            .collect()
    }
}
