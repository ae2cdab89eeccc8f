//! Stage 2: chunk staged files, embed each chunk, upload to the index.
//!
//! Failure isolation is two-level: a chunk whose embedding fails is
//! skipped and recorded; a file whose read, chunking, or upload fails is
//! skipped and recorded. Either way the run continues.

use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use crate::chunking::{ChunkingConfig, chunk_id, split_text};
use crate::embeddings::EmbeddingProvider;
use crate::staging::StagingArea;
use crate::stores::{ChunkRecord, VectorIndex};
use crate::types::PipelineError;

use super::report::{DocumentFailure, IndexingReport};

/// Runs the indexing stage over every staged `.txt` file.
///
/// The index is recreated first so its schema always matches the records
/// being uploaded; that failure, like a staging-directory read failure, is
/// batch-level and fatal.
pub async fn index_staged_files(
    staging: &StagingArea,
    provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    chunking: &ChunkingConfig,
) -> Result<IndexingReport, PipelineError> {
    index.recreate_index().await?;

    let files = staging.staged_files().await?;
    info!(count = files.len(), root = %staging.root().display(), "found staged files");

    let mut report = IndexingReport::default();

    for path in files {
        let file_name = display_name(&path);
        match index_one_file(&path, &file_name, provider, index, chunking).await {
            Ok(outcome) => {
                info!(file = %file_name, chunks = outcome.uploaded, "indexed staged file");
                report.indexed_files.push(path);
                report.chunks_uploaded += outcome.uploaded;
                report.chunk_failures.extend(outcome.chunk_failures);
            }
            Err(err) => {
                warn!(file = %file_name, error = %err, "failed to index file, continuing");
                report.file_failures.push(DocumentFailure {
                    name: file_name,
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

struct FileOutcome {
    uploaded: usize,
    chunk_failures: Vec<DocumentFailure>,
}

async fn index_one_file(
    path: &Path,
    file_name: &str,
    provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    chunking: &ChunkingConfig,
) -> Result<FileOutcome, PipelineError> {
    let text = fs::read_to_string(path).await?;
    let chunks = split_text(&text, chunking)?;
    info!(file = %file_name, chunks = chunks.len(), "split into chunks");

    let mut records = Vec::with_capacity(chunks.len());
    // Buffered locally; a file that fails outright is reported once, as a
    // file failure, not once per chunk as well.
    let mut chunk_failures = Vec::new();
    for chunk in &chunks {
        let id = chunk_id(file_name, chunk.index);
        match provider.embed(&chunk.text).await {
            Ok(embedding) => {
                records.push(ChunkRecord::new(
                    id,
                    file_name,
                    chunk.index,
                    chunk.offset,
                    chunk.text.clone(),
                    embedding,
                ));
            }
            Err(err) => {
                warn!(file = %file_name, chunk = chunk.index, error = %err, "failed to embed chunk, skipping");
                chunk_failures.push(DocumentFailure {
                    name: id,
                    error: err.to_string(),
                });
            }
        }
    }

    let uploaded = records.len();
    index.upload(records).await?;
    Ok(FileOutcome {
        uploaded,
        chunk_failures,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
