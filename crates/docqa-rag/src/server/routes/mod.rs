//! API routes for the RAG server

pub mod chat;
pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        // Ingestion - with larger body limit for document text
        .route(
            "/ingest",
            post(ingest::ingest_text).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        // Retrieval and answers
        .route("/search", post(query::search))
        .route("/answer", post(query::answer))
        .route("/chat", post(chat::chat))
        .route("/stats", get(query::stats))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let service = state.service();
    Json(serde_json::json!({
        "name": "docqa-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document question answering with grounded answers and extractive fallback",
        "embedder": service.embedder().name(),
        "dimension": service.config().embeddings.dimensions,
        "generator": {
            "provider": service.generator().name(),
            "model": service.generator().model()
        },
        "endpoints": {
            "POST /api/ingest": "Ingest extracted text under a source path",
            "POST /api/search": "Top-k chunks by cosine similarity",
            "POST /api/answer": "Grounded answer with sources",
            "POST /api/chat": "Intent-routed chat reply",
            "GET /api/stats": "Chunk, source, and topic counts"
        }
    }))
}
