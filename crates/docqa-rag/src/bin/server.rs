//! docqa-rag server binary
//!
//! Run with: cargo run -p docqa-rag --bin docqa-rag-server -- --config docqa.toml

use clap::Parser;
use docqa_rag::{config::RagConfig, server::RagServer, RagService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Document question answering server
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML configuration file (falls back to $DOCQA_CONFIG, then defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Documents directory (overrides `documents.dir`); its .txt/.md files
    /// are ingested before serving and on a chat refresh
    #[arg(long)]
    ingest_dir: Option<PathBuf>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = RagConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.ingest_dir {
        config.documents.dir = Some(dir);
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding backend: {:?}", config.embeddings.backend);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.generate_model);
    tracing::info!(
        "  - Chunk window: {} words ({} overlap)",
        config.chunking.window_words,
        config.chunking.overlap_words
    );
    tracing::info!("  - Data dir: {}", config.storage.data_dir.display());

    let service = Arc::new(RagService::new(config)?);

    // Check Ollama
    if !service.generator().health_check().await.unwrap_or(false) {
        tracing::warn!(
            "Generator '{}' not reachable; answers will use extractive fallback",
            service.generator().name()
        );
        tracing::warn!("Start Ollama with `ollama serve` and pull the configured models");
    }

    if let Some((dir, added)) = service.ingest_documents().await? {
        tracing::info!("Ingested {} new chunks from {}", added, dir.display());
    }

    let server = RagServer::new(service);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/ingest  - Ingest document text");
    println!("  POST /api/search  - Semantic search");
    println!("  POST /api/answer  - Ask questions");
    println!("  POST /api/chat    - Chat");
    println!("  GET  /api/stats   - Knowledge base statistics");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
