//! Stage 3 entry point: embed a query and print top-k index matches.
//!
//! A query can be passed as arguments (`query how are commissions paid`)
//! or entered interactively; `q`, `quit`, or `exit` ends the loop.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use reqwest::Client;
use tracing::error;
use tracing_subscriber::FmtSubscriber;

use ragline::config::{DEFAULT_TOP_K, EmbeddingConfig, SearchConfig};
use ragline::embeddings::HttpEmbeddingProvider;
use ragline::query::run_query;
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

    let client = Client::builder()
        .user_agent("ragline-query/0.1")
        .use_rustls_tls()
        .build()?;

    let provider = HttpEmbeddingProvider::new(client.clone(), &embedding_config);
    let index = SearchIndexClient::new(client, &search_config, embedding_config.dimensions);

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        let query = args.join(" ");
        return search_once(&provider, &index, &query).await;
    }

    println!("Vector search over '{}'", search_config.index_name);
    println!("--------------------");
    let stdin = io::stdin();
    loop {
        print!("\nEnter a search query (or 'q' to quit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if matches!(query.to_lowercase().as_str(), "q" | "quit" | "exit") {
            break;
        }
        if let Err(err) = search_once(&provider, &index, query).await {
            // A failed query should not end the session.
            println!("Error executing search: {err}");
        }
    }

    Ok(())
}

async fn search_once(
    provider: &HttpEmbeddingProvider,
    index: &SearchIndexClient,
    query: &str,
) -> Result<(), PipelineError> {
    println!("\n--- Searching for: '{query}' ---");
    let matches = run_query(provider, index, query, DEFAULT_TOP_K).await?;

    if matches.is_empty() {
        println!("\nNo results found.");
        return Ok(());
    }
    for result in matches {
        println!(
            "\n[Result {} | Score: {:.4}] File: {}",
            result.rank, result.score, result.source_file
        );
        println!("Preview: {}…", result.preview);
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
