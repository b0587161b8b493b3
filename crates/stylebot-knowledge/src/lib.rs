//! StyleBot knowledge crate - embedding service, chunker, knowledge index
//! and product catalog.
//!
//! Documents are split into overlapping chunks, embedded once at build time
//! and queried by brute-force cosine similarity. The index is immutable after
//! build; [`SharedKnowledgeIndex`] swaps in a rebuilt index atomically.

pub mod catalog;
pub mod chunk;
pub mod embedding;
pub mod index;
pub mod loader;
pub mod text;

pub use catalog::ProductCatalog;
pub use chunk::{chunk_text, ChunkingConfig};
pub use embedding::{embedder_from_config, DynEmbeddingService, EmbeddingService, LexicalEmbedding};
pub use index::{KnowledgeChunk, KnowledgeIndex, SharedKnowledgeIndex};
pub use loader::KnowledgeBase;
