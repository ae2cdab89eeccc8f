//! End-to-end pipeline test: HTTP-mocked blob container and extraction
//! service for stage 1, then chunking, mock embeddings, and the in-memory
//! index for stages 2 and 3.

use httpmock::prelude::*;
use reqwest::Client;
use tempfile::tempdir;
use url::Url;

use ragline::blob::BlobContainerClient;
use ragline::chunking::ChunkingConfig;
use ragline::config::{BlobConfig, ExtractionConfig};
use ragline::embeddings::MockEmbeddingProvider;
use ragline::extract::LayoutAnalysisClient;
use ragline::ingestion::{index_staged_files, ingest_documents};
use ragline::query::run_query;
use ragline::staging::StagingArea;
use ragline::stores::{MemoryIndex, VectorIndex};

const LISTING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<EnumerationResults>
  <Blobs>
    <Blob><Name>420/BackOffice/report final.pdf</Name>
      <Properties><Content-Length>1024</Content-Length></Properties></Blob>
    <Blob><Name>a.pdf</Name>
      <Properties><Content-Length>256</Content-Length></Properties></Blob>
    <Blob><Name>b.pdf</Name>
      <Properties><Content-Length>256</Content-Length></Properties></Blob>
  </Blobs>
</EnumerationResults>"#;

/// Wires up the container plus an extraction service where `a.pdf` fails
/// analysis and the other two succeed.
async fn mount_services(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/docs").query_param("comp", "list");
            then.status(200)
                .header("content-type", "application/xml")
                .body(LISTING);
        })
        .await;

    // Match on distinguishing path fragments; the first blob's path is
    // percent-encoded on the wire.
    for (fragment, body) in [
        ("BackOffice", "REPORT-BYTES"),
        ("a.pdf", "BROKEN-BYTES"),
        ("b.pdf", "B-BYTES"),
    ] {
        server
            .mock_async(move |when, then| {
                when.method(GET)
                    .path_contains(fragment)
                    .query_param("sig", "test");
                then.status(200).body(body);
            })
            .await;
    }

    // Analysis routing keys off the submitted bytes.
    for (marker, op) in [
        ("REPORT-BYTES", "/operations/report"),
        ("BROKEN-BYTES", "/operations/broken"),
        ("B-BYTES", "/operations/b"),
    ] {
        server
            .mock_async(move |when, then| {
                when.method(POST)
                    .path("/documentintelligence/documentModels/prebuilt-layout:analyze")
                    .body(marker);
                then.status(202)
                    .header("Operation-Location", server.url(op));
            })
            .await;
    }

    server
        .mock_async(|when, then| {
            when.method(GET).path("/operations/report");
            then.status(200).json_body(serde_json::json!({
                "status": "succeeded",
                "analyzeResult": {
                    "content": "Back office commissions are paid weekly. \
                                Totals are summarized per period in the report."
                }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/operations/broken");
            then.status(200).json_body(serde_json::json!({
                "status": "failed",
                "error": { "code": "ContentUnreadable" }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/operations/b");
            then.status(200).json_body(serde_json::json!({
                "status": "succeeded",
                "analyzeResult": { "content": "Vacation policy applies to all staff." }
            }));
        })
        .await;
}

#[tokio::test]
async fn three_blobs_one_failure_then_search_finds_the_staged_content() {
    let server = MockServer::start_async().await;
    mount_services(&server).await;

    let client = Client::builder().build().unwrap();
    let source = BlobContainerClient::new(
        client.clone(),
        &BlobConfig {
            container_url: Url::parse(&server.url("/docs")).unwrap(),
            sas_token: "sig=test".into(),
            prefix: String::new(),
        },
    );
    let extractor = LayoutAnalysisClient::new(
        client,
        &ExtractionConfig {
            endpoint: Url::parse(&server.base_url()).unwrap(),
            api_key: "di-key".into(),
        },
    )
    .with_polling(std::time::Duration::from_millis(5), 5);

    let dir = tempdir().unwrap();
    let mut staging = StagingArea::create(dir.path()).await.unwrap();

    // Stage 1: exactly one of three documents fails, the run still succeeds.
    let report = ingest_documents(&source, &extractor, &mut staging)
        .await
        .unwrap();
    assert_eq!(report.staged_count(), 2);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failures[0].name, "a.pdf");

    let staged = staging.staged_files().await.unwrap();
    assert_eq!(staged.len(), 2);
    assert!(staged.iter().any(|path| {
        path.file_name()
            .is_some_and(|name| name == "420_BackOffice_report_final.pdf.txt")
    }));

    // Stage 2: chunk, embed, upload.
    let provider = MockEmbeddingProvider::new(8);
    let index = MemoryIndex::new();
    let indexing = index_staged_files(&staging, &provider, &index, &ChunkingConfig::default())
        .await
        .unwrap();
    assert_eq!(indexing.file_count(), 2);
    assert!(!indexing.has_failures());
    assert_eq!(index.count().await.unwrap(), indexing.chunks_uploaded);

    // Stage 3: a query matching one staged chunk surfaces its source file.
    let full_chunk_text = "Back office commissions are paid weekly. \
                                Totals are summarized per period in the report.";
    let matches = run_query(&provider, &index, full_chunk_text, 2)
        .await
        .unwrap();
    assert!(!matches.is_empty());
    assert_eq!(
        matches[0].source_file,
        "420_BackOffice_report_final.pdf.txt"
    );
    assert!(matches[0].score >= matches.last().unwrap().score);
}
