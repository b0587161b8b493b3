//! Embedding service trait and the in-tree lexical embedder.
//!
//! - `LexicalEmbedding` maps text to a fixed-width vector by feature hashing
//!   normalized tokens. It needs no model files and is fully deterministic,
//!   which keeps retrieval reproducible in tests and offline deployments.
//! - Other backends plug in by implementing [`EmbeddingService`].

use std::collections::HashMap;
use std::sync::Arc;

use stylebot_core::config::RetrievalConfig;
use stylebot_core::error::StyleBotError;
use tracing::info;

use crate::text::tokenize;

/// Service for generating text embeddings.
///
/// Implementations convert text into fixed-dimensional vectors. Used both
/// when building the index and when embedding a query.
pub trait EmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, StyleBotError>> + Send;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Object-safe version of [`EmbeddingService`] for dynamic dispatch.
///
/// `EmbeddingService::embed` returns `impl Future`, so it cannot be used as a
/// trait object. This trait boxes the future instead, allowing
/// `Arc<dyn DynEmbeddingService>` to be stored without generics.
pub trait DynEmbeddingService: Send + Sync {
    /// Generate an embedding vector for the given text (boxed future).
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, StyleBotError>> + Send + 'a>,
    >;

    /// Return the dimensionality of vectors produced by this service.
    fn dimensions(&self) -> usize;
}

/// Blanket impl: any `EmbeddingService` automatically implements `DynEmbeddingService`.
impl<T: EmbeddingService> DynEmbeddingService for T {
    fn embed_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Vec<f32>, StyleBotError>> + Send + 'a>,
    > {
        Box::pin(self.embed(text))
    }

    fn dimensions(&self) -> usize {
        EmbeddingService::dimensions(self)
    }
}

/// Build the embedder named by `retrieval.embedding_model`.
pub fn embedder_from_config(
    config: &RetrievalConfig,
) -> Result<Arc<dyn DynEmbeddingService>, StyleBotError> {
    match config.embedding_model.as_str() {
        "lexical-hash" => {
            info!(
                model = "lexical-hash",
                dimensions = config.embedding_dimensions,
                "Using lexical embedding"
            );
            Ok(Arc::new(LexicalEmbedding::new(config.embedding_dimensions)))
        }
        other => Err(StyleBotError::Embedding(format!(
            "unknown embedding model '{}'",
            other
        ))),
    }
}

// ---------------------------------------------------------------------------
// LexicalEmbedding - signed feature hashing over normalized tokens
// ---------------------------------------------------------------------------

/// Deterministic bag-of-words embedding.
///
/// Each token is hashed to a bucket and a sign; weights use sublinear term
/// frequency (`1 + ln tf`) and the result is L2-normalized, so cosine
/// similarity reduces to a dot product over shared vocabulary.
#[derive(Debug, Clone)]
pub struct LexicalEmbedding {
    dimensions: usize,
}

impl LexicalEmbedding {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokenize(text) {
            *counts.entry(token).or_insert(0) += 1;
        }

        let mut result = vec![0.0f32; self.dimensions];
        for (token, tf) in counts {
            let h = fnv1a(token.as_bytes());
            let bucket = (h % self.dimensions as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            let weight = 1.0 + (tf as f32).ln();
            result[bucket] += sign * weight;
        }

        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }
        result
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a. Fixed across platforms and compiler releases, so vectors
/// from one build stay comparable with vectors from another.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

impl Default for LexicalEmbedding {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EmbeddingService for LexicalEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, StyleBotError> {
        if text.trim().is_empty() {
            return Err(StyleBotError::Embedding(
                "Cannot embed empty text".to_string(),
            ));
        }
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
