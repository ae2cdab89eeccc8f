//! Stage 3: embed a free-text query and search the vector index.

use tracing::info;

use crate::embeddings::EmbeddingProvider;
use crate::stores::VectorIndex;
use crate::types::PipelineError;

/// One ranked search result.
#[derive(Debug, Clone)]
pub struct RankedMatch {
    pub rank: usize,
    pub score: f32,
    pub source_file: String,
    /// First line's worth of the chunk, newlines flattened.
    pub preview: String,
}

const PREVIEW_CHARS: usize = 200;

/// Embeds `text` and returns the `top_k` nearest chunks, best first.
pub async fn run_query(
    provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    text: &str,
    top_k: usize,
) -> Result<Vec<RankedMatch>, PipelineError> {
    let query_vector = provider.embed(text).await?;
    info!(dimensions = query_vector.len(), top_k, "embedded query");

    let hits = index.search(&query_vector, top_k).await?;
    Ok(hits
        .into_iter()
        .enumerate()
        .map(|(position, hit)| RankedMatch {
            rank: position + 1,
            score: hit.score,
            source_file: if hit.source_file.is_empty() {
                "unknown".to_string()
            } else {
                hit.source_file
            },
            preview: preview_of(&hit.content),
        })
        .collect())
}

fn preview_of(content: &str) -> String {
    let flattened: String = content
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(PREVIEW_CHARS)
        .collect();
    flattened.trim().to_string()
}
