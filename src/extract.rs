//! Text extraction via the managed layout-analysis service.
//!
//! Documents are submitted as raw bytes to the `prebuilt-layout` model.
//! The service replies `202 Accepted` with an `Operation-Location` header;
//! the client polls that URL until the analysis succeeds and then returns
//! the extracted plain text.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use tokio::time;
use url::Url;

use crate::config::ExtractionConfig;
use crate::types::PipelineError;

const ANALYZE_API_VERSION: &str = "2024-11-30";
const MODEL_ID: &str = "prebuilt-layout";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Seam between the ingestion loop and the extraction service.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extracts plain text from one document's raw bytes.
    async fn extract(&self, name: &str, content: Bytes) -> Result<String, PipelineError>;
}

/// REST client for the layout-analysis model.
#[derive(Debug, Clone)]
pub struct LayoutAnalysisClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    poll_interval: Duration,
    max_polls: usize,
}

#[derive(Debug, Deserialize)]
struct AnalyzeOperation {
    status: String,
    #[serde(rename = "analyzeResult")]
    analyze_result: Option<AnalyzeResult>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    #[serde(default)]
    content: String,
}

impl LayoutAnalysisClient {
    pub fn new(client: Client, config: &ExtractionConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            poll_interval: Duration::from_secs(2),
            max_polls: 60,
        }
    }

    /// Overrides the polling cadence. Mostly useful in tests.
    #[must_use]
    pub fn with_polling(mut self, interval: Duration, max_polls: usize) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn analyze_url(&self) -> Result<Url, PipelineError> {
        let path = format!("documentintelligence/documentModels/{MODEL_ID}:analyze");
        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|err| PipelineError::Extraction(format!("bad endpoint: {err}")))?;
        url.set_query(Some(&format!("api-version={ANALYZE_API_VERSION}")));
        Ok(url)
    }

    async fn submit(&self, name: &str, content: Bytes) -> Result<Url, PipelineError> {
        let response = self
            .client
            .post(self.analyze_url()?)
            .header(KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(PipelineError::Extraction(format!(
                "analyze submit for '{name}' failed with status {status}"
            )));
        }

        let location = response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                PipelineError::Extraction(format!(
                    "analyze submit for '{name}' returned no operation location"
                ))
            })?;
        Url::parse(location)
            .map_err(|err| PipelineError::Extraction(format!("bad operation location: {err}")))
    }

    async fn poll(&self, name: &str, operation: Url) -> Result<String, PipelineError> {
        for attempt in 1..=self.max_polls {
            let operation_state: AnalyzeOperation = self
                .client
                .get(operation.clone())
                .header(KEY_HEADER, &self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match operation_state.status.as_str() {
                "succeeded" => {
                    return operation_state
                        .analyze_result
                        .map(|result| result.content)
                        .ok_or_else(|| {
                            PipelineError::Extraction(format!(
                                "analysis of '{name}' succeeded without a result"
                            ))
                        });
                }
                "failed" => {
                    let detail = operation_state
                        .error
                        .map(|err| err.to_string())
                        .unwrap_or_else(|| "no error detail".to_string());
                    return Err(PipelineError::Extraction(format!(
                        "analysis of '{name}' failed: {detail}"
                    )));
                }
                // notStarted / running; no point sleeping once the
                // budget is spent.
                _ if attempt < self.max_polls => time::sleep(self.poll_interval).await,
                _ => {}
            }
        }
        Err(PipelineError::Extraction(format!(
            "analysis of '{name}' did not finish within {} polls",
            self.max_polls
        )))
    }
}

#[async_trait]
impl TextExtractor for LayoutAnalysisClient {
    async fn extract(&self, name: &str, content: Bytes) -> Result<String, PipelineError> {
        let operation = self.submit(name, content).await?;
        self.poll(name, operation).await
    }
}
