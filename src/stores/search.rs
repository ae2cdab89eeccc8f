//! Managed vector-search REST backend.
//!
//! Wire surface:
//! - `GET/PUT/DELETE /indexes/{name}` for schema management
//! - `POST /indexes/{name}/docs/index` with `@search.action: mergeOrUpload`
//! - `POST /indexes/{name}/docs/search` with a `vectorQueries` body
//!
//! The schema carries `id` (key), `content` (searchable), `source_file`
//! (filterable), `chunk_index`, `offset`, and a vector field sized to the
//! configured embedding dimensionality behind an HNSW profile.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use super::{ChunkRecord, ScoredChunk, VectorIndex};
use crate::config::SearchConfig;
use crate::types::PipelineError;

const SEARCH_API_VERSION: &str = "2024-07-01";

#[derive(Debug, Clone)]
pub struct SearchIndexClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    index_name: String,
    vector_dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "@search.score")]
    score: f32,
    #[serde(default)]
    id: String,
    #[serde(default)]
    source_file: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    #[serde(rename = "@odata.count", default)]
    count: Option<usize>,
}

impl SearchIndexClient {
    pub fn new(client: Client, config: &SearchConfig, vector_dimensions: usize) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            vector_dimensions,
        }
    }

    fn url(&self, path: &str) -> Result<Url, PipelineError> {
        let mut url = self
            .endpoint
            .join(path)
            .map_err(|err| PipelineError::Index(format!("bad endpoint: {err}")))?;
        url.set_query(Some(&format!("api-version={SEARCH_API_VERSION}")));
        Ok(url)
    }

    fn index_schema(&self) -> Value {
        json!({
            "name": self.index_name,
            "fields": [
                { "name": "id", "type": "Edm.String", "key": true, "filterable": true },
                { "name": "content", "type": "Edm.String", "searchable": true },
                { "name": "source_file", "type": "Edm.String", "filterable": true },
                { "name": "chunk_index", "type": "Edm.Int32", "filterable": true },
                { "name": "offset", "type": "Edm.Int64", "filterable": false },
                {
                    "name": "embedding",
                    "type": "Collection(Edm.Single)",
                    "searchable": true,
                    "dimensions": self.vector_dimensions,
                    "vectorSearchProfile": "hnsw-profile"
                }
            ],
            "vectorSearch": {
                "algorithms": [ { "name": "hnsw-config", "kind": "hnsw" } ],
                "profiles": [ { "name": "hnsw-profile", "algorithm": "hnsw-config" } ]
            }
        })
    }

    async fn index_exists(&self) -> Result<bool, PipelineError> {
        let url = self.url(&format!("indexes/{}", self.index_name))?;
        let response = self
            .client
            .get(url)
            .header("api-key", &self.api_key)
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(PipelineError::Index(format!(
                "index lookup failed with status {status}"
            ))),
        }
    }

    async fn create_index(&self) -> Result<(), PipelineError> {
        let url = self.url(&format!("indexes/{}", self.index_name))?;
        let response = self
            .client
            .put(url)
            .header("api-key", &self.api_key)
            .json(&self.index_schema())
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::Index(format!(
                "index creation failed with status {status}"
            )));
        }
        Ok(())
    }

    async fn delete_index(&self) -> Result<(), PipelineError> {
        let url = self.url(&format!("indexes/{}", self.index_name))?;
        let response = self
            .client
            .delete(url)
            .header("api-key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(PipelineError::Index(format!(
                "index deletion failed with status {status}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SearchIndexClient {
    async fn ensure_index(&self) -> Result<(), PipelineError> {
        if self.index_exists().await? {
            return Ok(());
        }
        self.create_index().await
    }

    async fn recreate_index(&self) -> Result<(), PipelineError> {
        if self.index_exists().await? {
            tracing::info!(index = %self.index_name, "deleting existing index to match schema");
            self.delete_index().await?;
        }
        self.create_index().await
    }

    async fn upload(&self, chunks: Vec<ChunkRecord>) -> Result<(), PipelineError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let documents: Vec<Value> = chunks
            .into_iter()
            .map(|chunk| {
                json!({
                    "@search.action": "mergeOrUpload",
                    "id": chunk.id,
                    "content": chunk.content,
                    "source_file": chunk.source_file,
                    "chunk_index": chunk.chunk_index,
                    "offset": chunk.offset,
                    "embedding": chunk.embedding,
                })
            })
            .collect();

        let url = self.url(&format!("indexes/{}/docs/index", self.index_name))?;
        let response = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .json(&json!({ "value": documents }))
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::Index(format!(
                "document upload failed with status {status}"
            )));
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let url = self.url(&format!("indexes/{}/docs/search", self.index_name))?;
        let body = json!({
            "select": "id,content,source_file",
            "vectorQueries": [
                {
                    "kind": "vector",
                    "vector": query_vector,
                    "fields": "embedding",
                    "k": top_k,
                }
            ]
        });
        let response = self
            .client
            .post(url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::Index(format!(
                "search request failed with status {status}"
            )));
        }
        let parsed: SearchResponse = response.json().await?;
        Ok(parsed
            .value
            .into_iter()
            .map(|hit| ScoredChunk {
                id: hit.id,
                source_file: hit.source_file,
                content: hit.content,
                score: hit.score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize, PipelineError> {
        let url = self.url(&format!("indexes/{}/docs/$count", self.index_name))?;
        let response = self
            .client
            .get(url)
            .header("api-key", &self.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::Index(format!(
                "count request failed with status {status}"
            )));
        }
        let body = response.text().await?;
        // The $count endpoint returns a bare integer; tolerate a JSON
        // object with @odata.count as some emulators reply that way.
        if let Ok(count) = body.trim().parse::<usize>() {
            return Ok(count);
        }
        let parsed: CountResponse = serde_json::from_str(&body)
            .map_err(|err| PipelineError::Index(format!("unreadable count response: {err}")))?;
        parsed
            .count
            .ok_or_else(|| PipelineError::Index("count response had no count".into()))
    }
}
