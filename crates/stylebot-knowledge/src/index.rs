//! Immutable knowledge index with brute-force cosine similarity search.
//!
//! Built once from source documents and read-only afterwards, so any number
//! of sessions can query a snapshot concurrently. A rebuild produces a new
//! [`KnowledgeIndex`] which [`SharedKnowledgeIndex`] swaps in atomically;
//! readers holding the previous `Arc` keep a consistent view.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use stylebot_core::error::StyleBotError;
use stylebot_core::types::{ContextChunk, SourceDocument};
use tracing::{debug, info};

use crate::chunk::{chunk_text, ChunkingConfig};
use crate::embedding::{cosine_similarity, DynEmbeddingService};

/// A chunk of a source document with its embedding.
#[derive(Debug, Clone)]
pub struct KnowledgeChunk {
    /// Position in build order; also the tie-break key for equal scores.
    pub id: usize,
    pub source_label: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

pub struct KnowledgeIndex {
    chunks: Vec<KnowledgeChunk>,
    embedder: Arc<dyn DynEmbeddingService>,
    document_count: usize,
}

impl std::fmt::Debug for KnowledgeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeIndex")
            .field("chunks", &self.chunks.len())
            .field("documents", &self.document_count)
            .field("dimensions", &self.embedder.dimensions())
            .finish()
    }
}

impl KnowledgeIndex {
    /// An index with no documents. Every query returns no hits.
    pub fn empty(embedder: Arc<dyn DynEmbeddingService>) -> Self {
        Self {
            chunks: Vec::new(),
            embedder,
            document_count: 0,
        }
    }

    /// Chunk and embed every document.
    ///
    /// Documents with no text contribute no chunks. An embedding failure or
    /// a vector of the wrong width aborts the build.
    pub async fn build(
        documents: &[SourceDocument],
        embedder: Arc<dyn DynEmbeddingService>,
        chunking: ChunkingConfig,
    ) -> Result<Self, StyleBotError> {
        let dims = embedder.dimensions();
        let mut chunks = Vec::new();

        for doc in documents {
            for text in chunk_text(&doc.raw_text, chunking) {
                let embedding = embedder.embed_boxed(&text).await?;
                if embedding.len() != dims {
                    return Err(StyleBotError::Knowledge(format!(
                        "embedding for '{}' has {} dimensions, expected {}",
                        doc.label,
                        embedding.len(),
                        dims
                    )));
                }
                chunks.push(KnowledgeChunk {
                    id: chunks.len(),
                    source_label: doc.label.clone(),
                    text,
                    embedding,
                });
            }
        }

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            chunk_size = chunking.chunk_size,
            chunk_overlap = chunking.chunk_overlap,
            "Knowledge index built"
        );

        Ok(Self {
            chunks,
            embedder,
            document_count: documents.len(),
        })
    }

    /// Return up to `top_k` chunks scoring at least `similarity_threshold`,
    /// best first, equal scores ordered by chunk id.
    ///
    /// An empty query or no chunk above the threshold yields an empty vec.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<ContextChunk>, StyleBotError> {
        if query.trim().is_empty() || top_k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_boxed(query).await?;

        let mut scored: Vec<(usize, f64)> = self
            .chunks
            .iter()
            .map(|chunk| (chunk.id, cosine_similarity(&query_vec, &chunk.embedding)))
            .filter(|(_, score)| *score >= similarity_threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        debug!(hits = scored.len(), top_k, similarity_threshold, "Retrieval complete");

        Ok(scored
            .into_iter()
            .map(|(id, score)| {
                let chunk = &self.chunks[id];
                ContextChunk {
                    chunk_id: chunk.id,
                    source_label: chunk.source_label.clone(),
                    text: chunk.text.clone(),
                    score,
                }
            })
            .collect())
    }

    pub fn chunks(&self) -> &[KnowledgeChunk] {
        &self.chunks
    }

    pub fn embedder(&self) -> Arc<dyn DynEmbeddingService> {
        Arc::clone(&self.embedder)
    }

    pub fn document_count(&self) -> usize {
        self.document_count
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SharedKnowledgeIndex - versioned handle for atomic rebuilds
// ---------------------------------------------------------------------------

/// Versioned handle to the current index.
///
/// Readers take an `Arc` snapshot and never block a rebuild for longer than
/// the pointer swap.
#[derive(Debug)]
pub struct SharedKnowledgeIndex {
    current: RwLock<Arc<KnowledgeIndex>>,
    version: AtomicU64,
}

impl SharedKnowledgeIndex {
    pub fn new(index: KnowledgeIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
            version: AtomicU64::new(1),
        }
    }

    /// The index as of now. Later swaps do not affect the returned snapshot.
    pub fn snapshot(&self) -> Arc<KnowledgeIndex> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Swap in a new index and return the new version number.
    pub fn replace(&self, index: KnowledgeIndex) -> u64 {
        let next = Arc::new(index);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        let version = self.version.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        info!(version, "Knowledge index replaced");
        version
    }

    /// Build a fresh index off to the side with the current embedder, then
    /// swap it in. On failure the current index stays in place.
    pub async fn rebuild(
        &self,
        documents: &[SourceDocument],
        chunking: ChunkingConfig,
    ) -> Result<u64, StyleBotError> {
        let embedder = self.snapshot().embedder();
        let index = KnowledgeIndex::build(documents, embedder, chunking).await?;
        Ok(self.replace(index))
    }

    pub fn version(&self) -> u64 {
        self.version.load(AtomicOrdering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::LexicalEmbedding;

    fn embedder() -> Arc<dyn DynEmbeddingService> {
        Arc::new(LexicalEmbedding::default())
    }

    fn sample_docs() -> Vec<SourceDocument> {
        vec![
            SourceDocument::new(
                "faq.md",
                "Return Policy\n\nWe offer a 30-day return policy on all standard items. \
                 Custom designed items are non-returnable unless they arrive damaged.",
            ),
            SourceDocument::new(
                "shipping.md",
                "Standard shipping takes 5-7 business days. Express shipping takes 2-3 \
                 business days. International shipping is available to 40 countries.",
            ),
            SourceDocument::new(
                "care.md",
                "Wash printed garments inside out in cold water and tumble dry low.",
            ),
        ]
    }

    async fn sample_index() -> KnowledgeIndex {
        KnowledgeIndex::build(&sample_docs(), embedder(), ChunkingConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_counts_chunks() {
        let index = sample_index().await;
        assert_eq!(index.document_count(), 3);
        assert_eq!(index.len(), 3);
        for (i, chunk) in index.chunks().iter().enumerate() {
            assert_eq!(chunk.id, i);
            assert_eq!(chunk.embedding.len(), 1024);
        }
    }

    #[tokio::test]
    async fn test_retrieve_return_policy() {
        let index = sample_index().await;
        let hits = index.retrieve("What's your return policy?", 3, 0.1).await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].source_label, "faq.md");
        assert!(hits[0].text.contains("30-day"));
        assert!(hits[0].text.contains("non-returnable"));
    }

    #[tokio::test]
    async fn test_retrieve_respects_contract() {
        let index = sample_index().await;
        for query in ["shipping days", "wash cold water", "return custom items", "hello"] {
            for top_k in 1..=3 {
                let threshold = 0.05;
                let hits = index.retrieve(query, top_k, threshold).await.unwrap();
                assert!(hits.len() <= top_k);
                assert!(hits.iter().all(|h| h.score >= threshold));
                for pair in hits.windows(2) {
                    assert!(pair[0].score >= pair[1].score);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_retrieve_empty_query() {
        let index = sample_index().await;
        assert!(index.retrieve("", 3, 0.0).await.unwrap().is_empty());
        assert!(index.retrieve("   ", 3, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_below_threshold_is_empty() {
        let index = sample_index().await;
        let hits = index.retrieve("quantum chromodynamics", 3, 0.3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_equal_scores_ordered_by_chunk_id() {
        let docs = vec![
            SourceDocument::new("b.md", "identical text"),
            SourceDocument::new("a.md", "identical text"),
        ];
        let index = KnowledgeIndex::build(&docs, embedder(), ChunkingConfig::default())
            .await
            .unwrap();
        let hits = index.retrieve("identical text", 2, 0.5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, 0);
        assert_eq!(hits[1].chunk_id, 1);
        assert_eq!(hits[0].source_label, "b.md");
    }

    #[tokio::test]
    async fn test_empty_index() {
        let index = KnowledgeIndex::empty(embedder());
        assert!(index.is_empty());
        assert!(index.retrieve("anything", 3, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_long_document_is_chunked() {
        let body = (0..200)
            .map(|i| format!("sentence number {} about fabric care.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let docs = vec![SourceDocument::new("long.md", body)];
        let index = KnowledgeIndex::build(&docs, embedder(), ChunkingConfig::new(200, 20))
            .await
            .unwrap();
        assert!(index.len() > 10);
        assert!(index.chunks().iter().all(|c| c.text.chars().count() <= 200));
    }

    #[tokio::test]
    async fn test_shared_index_snapshot_survives_replace() {
        let shared = SharedKnowledgeIndex::new(sample_index().await);
        assert_eq!(shared.version(), 1);

        let before = shared.snapshot();
        let version = shared
            .rebuild(
                &[SourceDocument::new("new.md", "gift cards never expire")],
                ChunkingConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(version, 2);
        assert_eq!(shared.version(), 2);
        assert_eq!(before.len(), 3);
        assert_eq!(shared.snapshot().len(), 1);
        let hits = shared
            .snapshot()
            .retrieve("do gift cards expire", 1, 0.1)
            .await
            .unwrap();
        assert_eq!(hits[0].source_label, "new.md");
    }

    #[tokio::test]
    async fn test_concurrent_reads() {
        let shared = Arc::new(SharedKnowledgeIndex::new(sample_index().await));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(tokio::spawn(async move {
                shared
                    .snapshot()
                    .retrieve("express shipping", 2, 0.1)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            let hits = handle.await.unwrap();
            assert_eq!(hits[0].source_label, "shipping.md");
        }
    }
}
