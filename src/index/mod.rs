//! Per-document embedding index and top-K cosine retrieval.
//!
//! Embeddings are cached per document under a content-addressed key (sha-256 of the
//! normalized text), so re-uploading the same bytes never recomputes and re-using a filename
//! with different content never returns stale vectors. Cache population is single-flight:
//! concurrent requests for the same document join one embedding computation.

use crate::cache::SingleFlightCache;
use crate::embedding::{EmbeddingClient, EmbeddingClientError, cosine_similarity};
use crate::processing::types::{Clause, RankedClause};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::sync::Arc;

/// Embedding store and retrieval engine shared across requests.
pub struct EmbeddingIndex {
    client: Box<dyn EmbeddingClient + Send + Sync>,
    cache: SingleFlightCache<String, Arc<Vec<Vec<f32>>>>,
}

impl EmbeddingIndex {
    /// Build an index around `client` caching at most `cache_capacity` documents.
    pub fn new(client: Box<dyn EmbeddingClient + Send + Sync>, cache_capacity: usize) -> Self {
        Self {
            client,
            cache: SingleFlightCache::new(cache_capacity),
        }
    }

    /// Content-addressed cache key for a normalized document text.
    pub fn document_key(normalized_text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(normalized_text.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Return the clause embeddings for `key`, computing and caching them on first access.
    ///
    /// The stored vector list is index-aligned with `clauses`; concurrent callers for the
    /// same key await the in-flight computation instead of re-embedding.
    pub async fn ensure_document(
        &self,
        key: &str,
        clauses: &[Clause],
    ) -> Result<Arc<Vec<Vec<f32>>>, EmbeddingClientError> {
        let texts: Vec<String> = clauses.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .cache
            .get_or_try_compute(key.to_string(), || async {
                tracing::debug!(key, clauses = texts.len(), "Embedding document clauses");
                let vectors = self.client.embed_batch(texts).await?;
                Ok(Arc::new(vectors))
            })
            .await?;

        debug_assert_eq!(embeddings.len(), clauses.len());
        Ok(embeddings)
    }

    /// Retrieve the clauses most similar to `query` from the document cached under `key`.
    ///
    /// Ranks every clause by cosine similarity (descending, clause position as tiebreak),
    /// keeps the top `top_k`, then applies `thresholds` in order: the first stage that
    /// leaves a non-empty set wins. An empty result is a normal "no evidence" outcome.
    pub async fn retrieve(
        &self,
        query: &str,
        key: &str,
        clauses: &[Clause],
        top_k: usize,
        thresholds: &[f32],
    ) -> Result<Vec<RankedClause>, EmbeddingClientError> {
        if clauses.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.ensure_document(key, clauses).await?;
        let mut query_vectors = self.client.embed_batch(vec![query.to_string()]).await?;
        let query_vector = query_vectors.pop().ok_or_else(|| {
            EmbeddingClientError::GenerationFailed("no query embedding produced".to_string())
        })?;

        let mut ranked: Vec<RankedClause> = clauses
            .iter()
            .zip(embeddings.iter())
            .map(|(clause, vector)| RankedClause {
                clause: clause.clone(),
                similarity: cosine_similarity(&query_vector, vector),
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then(a.clause.position.cmp(&b.clause.position))
        });
        ranked.truncate(top_k.min(clauses.len()));

        for threshold in thresholds {
            let passing: Vec<RankedClause> = ranked
                .iter()
                .filter(|r| r.similarity > *threshold)
                .cloned()
                .collect();
            if !passing.is_empty() {
                tracing::debug!(
                    threshold,
                    hits = passing.len(),
                    "Retrieval stage produced results"
                );
                return Ok(passing);
            }
        }

        tracing::debug!("No clause cleared any similarity threshold");
        Ok(Vec::new())
    }
}
