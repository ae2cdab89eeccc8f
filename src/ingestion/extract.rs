//! Stage 1: the resilient batch ingestion loop.
//!
//! Enumerates every blob under the configured prefix and, for each one
//! independently, downloads the bytes, extracts text, and stages the
//! result. Any error while processing a single blob is recorded in the
//! report and the loop continues; only the initial listing is allowed to
//! abort the run.

use tracing::{info, warn};

use crate::blob::DocumentSource;
use crate::extract::TextExtractor;
use crate::staging::StagingArea;
use crate::types::PipelineError;

use super::report::{DocumentFailure, IngestionReport};

/// Runs the extraction stage over every enumerated blob.
///
/// Returns `Err` only for batch-level failures (the listing itself); the
/// returned report carries per-document outcomes, and the run as a whole
/// succeeds even when a strict subset of documents failed.
pub async fn ingest_documents(
    source: &dyn DocumentSource,
    extractor: &dyn TextExtractor,
    staging: &mut StagingArea,
) -> Result<IngestionReport, PipelineError> {
    let blobs = source.list().await?;
    info!(count = blobs.len(), "enumerated blobs");

    let mut report = IngestionReport::default();

    for blob in &blobs {
        // Directory placeholders list as zero-size objects.
        if blob.size == 0 {
            info!(name = %blob.name, "skipping empty blob");
            report.skipped.push(blob.name.clone());
            continue;
        }

        info!(name = %blob.name, size = blob.size, "processing blob");
        match process_one(source, extractor, staging, blob).await {
            Ok(staged) => {
                info!(name = %blob.name, path = %staged.path.display(), "staged document");
                report.staged.push(staged);
            }
            Err(err) => {
                warn!(name = %blob.name, error = %err, "failed to process blob, continuing");
                report.failures.push(DocumentFailure {
                    name: blob.name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

async fn process_one(
    source: &dyn DocumentSource,
    extractor: &dyn TextExtractor,
    staging: &mut StagingArea,
    blob: &crate::blob::BlobRef,
) -> Result<crate::staging::StagedFile, PipelineError> {
    let content = source.fetch(blob).await?;
    let text = extractor.extract(&blob.name, content).await?;
    staging.write(&blob.name, &text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::BlobRef;
    use async_trait::async_trait;
    use bytes::Bytes;
    use tempfile::tempdir;

    struct FixedSource {
        blobs: Vec<BlobRef>,
    }

    #[async_trait]
    impl DocumentSource for FixedSource {
        async fn list(&self) -> Result<Vec<BlobRef>, PipelineError> {
            Ok(self.blobs.clone())
        }

        async fn fetch(&self, blob: &BlobRef) -> Result<Bytes, PipelineError> {
            Ok(Bytes::from(format!("%PDF {}", blob.name)))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl DocumentSource for FailingSource {
        async fn list(&self) -> Result<Vec<BlobRef>, PipelineError> {
            Err(PipelineError::Blob(
                "container listing failed with status 403".into(),
            ))
        }

        async fn fetch(&self, _blob: &BlobRef) -> Result<Bytes, PipelineError> {
            unreachable!("listing already failed")
        }
    }

    /// Extractor that fails for blob names containing a marker.
    struct SelectiveExtractor {
        fail_on: &'static str,
    }

    #[async_trait]
    impl TextExtractor for SelectiveExtractor {
        async fn extract(&self, name: &str, _content: Bytes) -> Result<String, PipelineError> {
            if name.contains(self.fail_on) {
                Err(PipelineError::Extraction(format!(
                    "analysis of '{name}' failed: simulated"
                )))
            } else {
                Ok(format!("extracted text of {name}"))
            }
        }
    }

    fn blob(name: &str, size: u64) -> BlobRef {
        BlobRef {
            name: name.to_string(),
            size,
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let dir = tempdir().unwrap();
        let mut staging = StagingArea::create(dir.path()).await.unwrap();
        let source = FixedSource {
            blobs: vec![
                blob("420/BackOffice/report final.pdf", 10240),
                blob("a.pdf", 512),
                blob("b.pdf", 512),
            ],
        };
        let extractor = SelectiveExtractor { fail_on: "a.pdf" };

        let report = ingest_documents(&source, &extractor, &mut staging)
            .await
            .unwrap();

        assert_eq!(report.staged_count(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].name, "a.pdf");

        let files = staging.staged_files().await.unwrap();
        assert_eq!(files.len(), 2);
        assert!(
            files.iter().any(|path| path
                .file_name()
                .is_some_and(|f| f == "420_BackOffice_report_final.pdf.txt")),
            "sanitized name of the first blob should be present"
        );
    }

    #[tokio::test]
    async fn zero_size_blobs_are_skipped_not_failed() {
        let dir = tempdir().unwrap();
        let mut staging = StagingArea::create(dir.path()).await.unwrap();
        let source = FixedSource {
            blobs: vec![blob("folder/", 0), blob("doc.pdf", 100)],
        };
        let extractor = SelectiveExtractor { fail_on: "\u{0}" };

        let report = ingest_documents(&source, &extractor, &mut staging)
            .await
            .unwrap();

        assert_eq!(report.staged_count(), 1);
        assert_eq!(report.skipped, vec!["folder/".to_string()]);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn listing_failure_is_batch_level_and_fatal() {
        let dir = tempdir().unwrap();
        let mut staging = StagingArea::create(dir.path()).await.unwrap();
        let extractor = SelectiveExtractor { fail_on: "\u{0}" };

        let result = ingest_documents(&FailingSource, &extractor, &mut staging).await;
        assert!(matches!(result, Err(PipelineError::Blob(_))));
        assert!(staging.staged_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn staged_text_matches_extractor_output() {
        let dir = tempdir().unwrap();
        let mut staging = StagingArea::create(dir.path()).await.unwrap();
        let source = FixedSource {
            blobs: vec![blob("doc.pdf", 42)],
        };
        let extractor = SelectiveExtractor { fail_on: "\u{0}" };

        let report = ingest_documents(&source, &extractor, &mut staging)
            .await
            .unwrap();
        let staged = &report.staged[0];
        let content = tokio::fs::read_to_string(&staged.path).await.unwrap();
        assert_eq!(content, "extracted text of doc.pdf");
    }
}
