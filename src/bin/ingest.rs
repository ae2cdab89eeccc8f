//! Stage 1 entry point: enumerate blobs, extract text, stage locally.

use std::process::ExitCode;
use std::time::Instant;

use reqwest::Client;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

use ragline::blob::BlobContainerClient;
use ragline::config::{BlobConfig, ExtractionConfig, staging_dir_from_env};
use ragline::extract::LayoutAnalysisClient;
use ragline::ingestion::ingest_documents;
use ragline::staging::StagingArea;
use ragline::types::PipelineError;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    dotenvy::dotenv().ok();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), PipelineError> {
    let blob_config = BlobConfig::from_env()?;
    let extraction_config = ExtractionConfig::from_env()?;
    let staging_dir = staging_dir_from_env();

    let client = Client::builder()
        .user_agent("ragline-ingest/0.1")
        .use_rustls_tls()
        .build()?;

    let source = BlobContainerClient::new(client.clone(), &blob_config);
    let extractor = LayoutAnalysisClient::new(client, &extraction_config);
    let mut staging = StagingArea::create(&staging_dir).await?;

    println!(
        "Ingesting from '{}' (prefix '{}') into {}",
        blob_config.container_url, blob_config.prefix, staging_dir.display()
    );

    let start = Instant::now();
    let report = ingest_documents(&source, &extractor, &mut staging).await?;

    println!("\nIngestion complete.");
    println!("  documents staged : {}", report.staged_count());
    println!("  empty blobs      : {}", report.skipped.len());
    println!("  failures         : {}", report.failure_count());
    println!("  duration         : {:.1?}", start.elapsed());

    for failure in &report.failures {
        println!("  ✗ {} — {}", failure.name, failure.error);
    }

    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let subscriber = FmtSubscriber::builder().with_env_filter("info").finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
