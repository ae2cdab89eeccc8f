//! Outcome accumulators for the stage drivers.

use std::path::PathBuf;

use crate::staging::StagedFile;

/// One document that failed and was skipped.
#[derive(Debug)]
pub struct DocumentFailure {
    /// Source blob name or staged filename.
    pub name: String,
    /// Rendered error that caused the skip.
    pub error: String,
}

/// Outcome of a stage-1 ingestion run.
#[derive(Debug, Default)]
pub struct IngestionReport {
    /// Documents staged successfully.
    pub staged: Vec<StagedFile>,
    /// Zero-size blobs skipped without an attempt.
    pub skipped: Vec<String>,
    /// Documents that failed download, extraction, or staging.
    pub failures: Vec<DocumentFailure>,
}

impl IngestionReport {
    /// Number of documents staged successfully.
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Number of documents that failed and were skipped.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// `true` when at least one document failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Outcome of a stage-2 indexing run.
#[derive(Debug, Default)]
pub struct IndexingReport {
    /// Staged files whose chunks reached the index.
    pub indexed_files: Vec<PathBuf>,
    /// Total chunks uploaded.
    pub chunks_uploaded: usize,
    /// Chunks skipped because embedding them failed.
    pub chunk_failures: Vec<DocumentFailure>,
    /// Files skipped entirely (read, chunking, or upload failure).
    pub file_failures: Vec<DocumentFailure>,
}

impl IndexingReport {
    /// Number of files fully or partially indexed.
    pub fn file_count(&self) -> usize {
        self.indexed_files.len()
    }

    /// `true` when any chunk or file failed.
    pub fn has_failures(&self) -> bool {
        !self.chunk_failures.is_empty() || !self.file_failures.is_empty()
    }
}
