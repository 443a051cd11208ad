//! Embedding client abstraction and the deterministic local fallback.

use crate::config::get_config;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
///
/// Implementations must be order-preserving: vector `i` of the output corresponds to text `i`
/// of the input, and every vector has the configured dimensionality.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied text.
    async fn embed_batch(&self, texts: Vec<String>)
    -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Deterministic fallback embedding client.
///
/// Hashes byte content into a fixed-dimension unit vector. Not a semantic model, but stable
/// across runs, which keeps the retrieval pipeline and its tests fully reproducible without a
/// model runtime.
pub struct HashEmbeddingClient;

impl HashEmbeddingClient {
    /// Construct a new deterministic embedding client instance.
    pub const fn new() -> Self {
        Self
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            // Basic hashing of content into the vector slot
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

impl Default for HashEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed_batch(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let config = get_config();
        let dimension = config.embedding_dimension;

        tracing::debug!(dimension, count = texts.len(), "Generating embeddings");

        if dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }

        let embeddings = texts
            .into_iter()
            .map(|text| Self::encode(&text, dimension))
            .collect();

        Ok(embeddings)
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn get_embedding_client() -> Box<dyn EmbeddingClient + Send + Sync> {
    Box::new(HashEmbeddingClient::new())
}

/// Cosine similarity mapped into `[0, 1]`.
///
/// Raw cosine lives in `[-1, 1]`; anything negative carries no retrieval signal here and is
/// clamped to zero. Mismatched lengths and zero vectors score zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}
