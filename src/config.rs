//! Startup configuration for the three pipeline stages.
//!
//! Every setting is read from the environment exactly once, validated
//! eagerly, and carried through the stages as an explicit struct. Missing
//! required variables fail fast with [`PipelineError::Config`] before any
//! network call is made.
//!
//! | Variable | Required | Purpose |
//! |---|---|---|
//! | `BLOB_CONTAINER_URL` | ingest | container endpoint, e.g. `https://acct.blob.example.net/docs` |
//! | `BLOB_SAS_TOKEN` | ingest | query-string credential appended to container requests |
//! | `BLOB_PREFIX` | no | restrict enumeration to a path prefix |
//! | `DOCINTEL_ENDPOINT` | ingest | layout-analysis service endpoint |
//! | `DOCINTEL_KEY` | ingest | layout-analysis API key |
//! | `EMBEDDING_ENDPOINT` | index, query | embedding service endpoint |
//! | `EMBEDDING_API_KEY` | index, query | embedding API key |
//! | `EMBEDDING_DEPLOYMENT` | index, query | embedding model deployment name |
//! | `EMBEDDING_DIMENSIONS` | no | vector width, default 1536 |
//! | `SEARCH_ENDPOINT` | index, query | vector-search service endpoint |
//! | `SEARCH_API_KEY` | index, query | vector-search admin key |
//! | `SEARCH_INDEX` | index, query | index name |
//! | `STAGING_DIR` | no | local staging directory, default `processed_data` |

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::chunking::ChunkingConfig;
use crate::types::PipelineError;

/// Default directory holding staged `.txt` files between stages 1 and 2.
pub const DEFAULT_STAGING_DIR: &str = "processed_data";

/// Default embedding vector width.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

/// Default number of neighbors returned by the query tool.
pub const DEFAULT_TOP_K: usize = 3;

/// Blob container scope and credential.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub container_url: Url,
    pub sas_token: String,
    pub prefix: String,
}

/// Layout-analysis service endpoint and credential.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub endpoint: Url,
    pub api_key: String,
}

/// Embedding service endpoint, deployment, and expected vector width.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub deployment: String,
    pub dimensions: usize,
}

/// Vector-search service endpoint and target index.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: Url,
    pub api_key: String,
    pub index_name: String,
}

/// Aggregate configuration threaded through every stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blob: BlobConfig,
    pub extraction: ExtractionConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    pub staging_dir: PathBuf,
    pub chunking: ChunkingConfig,
}

impl PipelineConfig {
    /// Loads the full configuration, validating everything up front.
    ///
    /// The binaries only need subsets and call the narrower constructors
    /// below; this aggregate is for embedders driving all three stages.
    pub fn from_env() -> Result<Self, PipelineError> {
        Ok(Self {
            blob: BlobConfig::from_env()?,
            extraction: ExtractionConfig::from_env()?,
            embedding: EmbeddingConfig::from_env()?,
            search: SearchConfig::from_env()?,
            staging_dir: staging_dir_from_env(),
            chunking: ChunkingConfig::default(),
        })
    }
}

impl BlobConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Ok(Self {
            container_url: required_url("BLOB_CONTAINER_URL")?,
            sas_token: required_var("BLOB_SAS_TOKEN")?,
            prefix: optional_var("BLOB_PREFIX").unwrap_or_default(),
        })
    }
}

impl ExtractionConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Ok(Self {
            endpoint: required_url("DOCINTEL_ENDPOINT")?,
            api_key: required_var("DOCINTEL_KEY")?,
        })
    }
}

impl EmbeddingConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        let dimensions = match optional_var("EMBEDDING_DIMENSIONS") {
            Some(raw) => raw.parse::<usize>().map_err(|err| {
                PipelineError::Config(format!("EMBEDDING_DIMENSIONS is not a number: {err}"))
            })?,
            None => DEFAULT_EMBEDDING_DIMENSIONS,
        };
        if dimensions == 0 {
            return Err(PipelineError::Config(
                "EMBEDDING_DIMENSIONS must be positive".into(),
            ));
        }
        Ok(Self {
            endpoint: required_url("EMBEDDING_ENDPOINT")?,
            api_key: required_var("EMBEDDING_API_KEY")?,
            deployment: required_var("EMBEDDING_DEPLOYMENT")?,
            dimensions,
        })
    }
}

impl SearchConfig {
    pub fn from_env() -> Result<Self, PipelineError> {
        Ok(Self {
            endpoint: required_url("SEARCH_ENDPOINT")?,
            api_key: required_var("SEARCH_API_KEY")?,
            index_name: required_var("SEARCH_INDEX")?,
        })
    }
}

/// Staging directory, defaulting to [`DEFAULT_STAGING_DIR`].
pub fn staging_dir_from_env() -> PathBuf {
    optional_var("STAGING_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_DIR))
}

fn required_var(name: &str) -> Result<String, PipelineError> {
    optional_var(name).ok_or_else(|| PipelineError::missing_env(name))
}

fn optional_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn required_url(name: &str) -> Result<Url, PipelineError> {
    let raw = required_var(name)?;
    Url::parse(&raw).map_err(|err| PipelineError::Config(format!("{name} is not a valid URL: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env mutation is process-wide; keep all env-touching assertions in a
    // single test to avoid interference under the parallel test runner.
    #[test]
    fn embedding_config_env_round_trip() {
        unsafe {
            env::set_var("EMBEDDING_ENDPOINT", "https://embed.example.net");
            env::set_var("EMBEDDING_API_KEY", "secret");
            env::set_var("EMBEDDING_DEPLOYMENT", "text-embedding-ada-002");
            env::remove_var("EMBEDDING_DIMENSIONS");
        }
        let config = EmbeddingConfig::from_env().unwrap();
        assert_eq!(config.dimensions, DEFAULT_EMBEDDING_DIMENSIONS);
        assert_eq!(config.deployment, "text-embedding-ada-002");

        unsafe {
            env::set_var("EMBEDDING_DIMENSIONS", "8");
        }
        let config = EmbeddingConfig::from_env().unwrap();
        assert_eq!(config.dimensions, 8);

        unsafe {
            env::set_var("EMBEDDING_DIMENSIONS", "not-a-number");
        }
        assert!(matches!(
            EmbeddingConfig::from_env(),
            Err(PipelineError::Config(_))
        ));

        unsafe {
            env::remove_var("EMBEDDING_API_KEY");
            env::set_var("EMBEDDING_DIMENSIONS", "8");
        }
        let err = EmbeddingConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("EMBEDDING_API_KEY"));
    }
}
