//! In-process vector index for tests and offline smoke runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChunkRecord, ScoredChunk, VectorIndex};
use crate::types::PipelineError;

/// Brute-force cosine-similarity index held in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    chunks: RwLock<Vec<ChunkRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_index(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn recreate_index(&self) -> Result<(), PipelineError> {
        self.chunks.write().await.clear();
        Ok(())
    }

    async fn upload(&self, chunks: Vec<ChunkRecord>) -> Result<(), PipelineError> {
        let mut guard = self.chunks.write().await;
        for incoming in chunks {
            match guard.iter_mut().find(|existing| existing.id == incoming.id) {
                Some(existing) => *existing = incoming,
                None => guard.push(incoming),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let guard = self.chunks.read().await;
        let mut scored: Vec<ScoredChunk> = guard
            .iter()
            .map(|chunk| ScoredChunk {
                id: chunk.id.clone(),
                source_file: chunk.source_file.clone(),
                content: chunk.content.clone(),
                score: cosine_similarity(&chunk.embedding, query_vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn count(&self) -> Result<usize, PipelineError> {
        Ok(self.chunks.read().await.len())
    }
}
