//! Embedding providers.
//!
//! [`EmbeddingProvider`] is the seam the indexing and query stages depend
//! on; [`HttpEmbeddingProvider`] speaks the managed deployment REST API
//! and [`MockEmbeddingProvider`] produces deterministic vectors for tests.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::config::EmbeddingConfig;
use crate::types::PipelineError;

const EMBEDDINGS_API_VERSION: &str = "2024-02-01";

/// Produces fixed-dimension vectors for batches of text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds each input text, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Width every returned vector is guaranteed to have.
    fn dimensions(&self) -> usize;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| PipelineError::Embedding("provider returned no vector".into()))
    }
}

/// REST client for an embedding model deployment.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: Url,
    api_key: String,
    deployment: String,
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(client: Client, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            deployment: config.deployment.clone(),
            dimensions: config.dimensions,
        }
    }

    fn embeddings_url(&self) -> Result<Url, PipelineError> {
        let path = format!("openai/deployments/{}/embeddings", self.deployment);
        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|err| PipelineError::Embedding(format!("bad endpoint: {err}")))?;
        url.set_query(Some(&format!("api-version={EMBEDDINGS_API_VERSION}")));
        Ok(url)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .post(self.embeddings_url()?)
            .header("api-key", &self.api_key)
            .json(&json!({ "input": texts }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::Embedding(format!(
                "embedding request failed with status {status}"
            )));
        }

        let parsed: EmbeddingsResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(PipelineError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        let mut vectors = Vec::with_capacity(parsed.data.len());
        for item in parsed.data {
            if item.embedding.len() != self.dimensions {
                return Err(PipelineError::Embedding(format!(
                    "vector has {} dimensions, expected {}",
                    item.embedding.len(),
                    self.dimensions
                )));
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Deterministic hash-derived embeddings for tests and offline smoke runs.
///
/// The same text always maps to the same vector, and nearby repetitions of
/// a text embed identically, which is enough structure for similarity
/// assertions without a live service.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_to_vec(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();
        (0..self.dimensions)
            .map(|i| {
                let bits = seed.rotate_left((i % 64) as u32) ^ ((i as u64) << 24);
                (bits as f32) / u64::MAX as f32
            })
            .collect()
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts.iter().map(|text| self.hash_to_vec(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
