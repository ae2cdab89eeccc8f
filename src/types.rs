//! Shared error type for every pipeline stage.
//!
//! The taxonomy mirrors how failures propagate: [`PipelineError::Config`]
//! and batch-level service errors are fatal and surface through `?`, while
//! per-document errors are caught by the ingestion loops and accumulated
//! into stage reports instead of propagating.

use thiserror::Error;

/// Errors produced by pipeline stages and service clients.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid startup configuration. Always fatal; no partial
    /// run is attempted.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level HTTP failure talking to a managed service.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure (staging reads/writes).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The blob container rejected a request or returned an unreadable
    /// listing. Fatal when raised during enumeration.
    #[error("blob store error: {0}")]
    Blob(String),

    /// The layout-analysis service failed to extract text from a document.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Chunking produced no usable windows or the splitter configuration
    /// was rejected.
    #[error("chunking error: {0}")]
    Chunking(String),

    /// The embedding service returned an error or a vector of the wrong
    /// dimensionality.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The vector index rejected a schema, upload, or search request.
    #[error("index error: {0}")]
    Index(String),

    /// A document that cannot be processed at all (empty, undecodable).
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl PipelineError {
    /// Required environment variable was absent or empty.
    pub fn missing_env(name: &str) -> Self {
        Self::Config(format!("missing required environment variable: {name}"))
    }
}
