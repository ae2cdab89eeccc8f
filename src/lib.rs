//! ```text
//! Blob container ──► blob::BlobContainerClient ──┐
//!                                                │
//! Raw bytes ──► extract::LayoutAnalysisClient ───┤
//!                                                ▼
//!                         ingestion::ingest_documents ──► staging::StagingArea
//!
//! Staged text ──► chunking::split_text ──► embeddings::EmbeddingProvider
//!                                    │
//!                                    └─► ingestion::index_staged_files
//!                                                │
//!                                                ▼
//!                              stores::VectorIndex (managed REST / in-memory)
//!
//! Query text ──► query::run_query ──► ranked matches
//! ```
//!
//! Each stage is strictly sequential; a single document's failure is
//! recorded in the stage report and never aborts the batch.

pub mod blob;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod extract;
pub mod ingestion;
pub mod query;
pub mod staging;
pub mod stores;
pub mod types;

pub use blob::{BlobContainerClient, BlobRef, DocumentSource};
pub use chunking::{ChunkingConfig, TextChunk, split_text};
pub use config::PipelineConfig;
pub use embeddings::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
pub use extract::{LayoutAnalysisClient, TextExtractor};
pub use ingestion::{IndexingReport, IngestionReport, ingest_documents, index_staged_files};
pub use query::{RankedMatch, run_query};
pub use staging::{StagingArea, sanitize_blob_name};
pub use stores::{ChunkRecord, ScoredChunk, VectorIndex};
pub use types::PipelineError;
