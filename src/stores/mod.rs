//! Vector-index backends for chunk records.
//!
//! [`VectorIndex`] abstracts over where embedded chunks live so the
//! indexing and query stages do not care which backend they talk to:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorIndex trait│
//!                  └────────┬─────────┘
//!                           │
//!             ┌─────────────┴─────────────┐
//!             ▼                           ▼
//!    ┌─────────────────┐        ┌──────────────────┐
//!    │ SearchIndexClient│        │   MemoryIndex    │
//!    │  (managed REST)  │        │ (tests / smoke)  │
//!    └─────────────────┘        └──────────────────┘
//! ```

pub mod memory;
pub mod search;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

pub use memory::MemoryIndex;
pub use search::SearchIndexClient;

/// One embedded chunk, ready for upload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Index document key, restricted to `[A-Za-z0-9_\-=]`.
    pub id: String,
    /// Staged filename the chunk was cut from.
    pub source_file: String,
    /// Zero-based position of the chunk within its source.
    pub chunk_index: usize,
    /// Byte offset of the chunk within the source text.
    pub offset: usize,
    /// The chunk text.
    pub content: String,
    /// Embedding vector; fixed dimensionality for every chunk of a run.
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    pub fn new(
        id: impl Into<String>,
        source_file: impl Into<String>,
        chunk_index: usize,
        offset: usize,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            id: id.into(),
            source_file: source_file.into(),
            chunk_index,
            offset,
            content: content.into(),
            embedding,
        }
    }
}

/// A search hit: the stored chunk fields plus its similarity score.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub id: String,
    pub source_file: String,
    pub content: String,
    pub score: f32,
}

/// Backend-agnostic interface to a vector index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the index schema if it does not exist yet.
    async fn ensure_index(&self) -> Result<(), PipelineError>;

    /// Drops any existing index and recreates it so the schema matches.
    async fn recreate_index(&self) -> Result<(), PipelineError>;

    /// Uploads a batch of chunk records (upsert semantics).
    async fn upload(&self, chunks: Vec<ChunkRecord>) -> Result<(), PipelineError>;

    /// Nearest-neighbor search, most similar first.
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError>;

    /// Number of documents currently in the index.
    async fn count(&self) -> Result<usize, PipelineError>;
}
