//! Stage 2 entry point: chunk staged files, embed, upload to the index.

use std::process::ExitCode;
use std::time::Instant;

use reqwest::Client;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

use ragline::chunking::ChunkingConfig;
use ragline::config::{EmbeddingConfig, SearchConfig, staging_dir_from_env};
use ragline::embeddings::HttpEmbeddingProvider;
use ragline::ingestion::index_staged_files;
use ragline::staging::StagingArea;
use ragline::stores::SearchIndexClient;
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
    let embedding_config = EmbeddingConfig::from_env()?;
    let search_config = SearchConfig::from_env()?;
    let staging_dir = staging_dir_from_env();

    let client = Client::builder()
        .user_agent("ragline-index/0.1")
        .use_rustls_tls()
        .build()?;

    let provider = HttpEmbeddingProvider::new(client.clone(), &embedding_config);
    let index = SearchIndexClient::new(client, &search_config, embedding_config.dimensions);
    let staging = StagingArea::create(&staging_dir).await?;

    println!(
        "Indexing staged files from {} into '{}'",
        staging_dir.display(),
        search_config.index_name
    );

    let start = Instant::now();
    let report = index_staged_files(&staging, &provider, &index, &ChunkingConfig::default()).await?;

    println!("\nIndexing complete.");
    println!("  files indexed   : {}", report.file_count());
    println!("  chunks uploaded : {}", report.chunks_uploaded);
    println!("  chunk failures  : {}", report.chunk_failures.len());
    println!("  file failures   : {}", report.file_failures.len());
    println!("  duration        : {:.1?}", start.elapsed());

    for failure in report.chunk_failures.iter().chain(&report.file_failures) {
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
