//! Document ingestion endpoint

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{IngestRequest, IngestResponse};

/// POST /api/ingest - Ingest extracted text under a source path
pub async fn ingest_text(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();

    if request.source_path.trim().is_empty() {
        return Err(Error::Config("source_path must not be empty".to_string()));
    }

    let outcome = state
        .service()
        .ingest_outcome(&request.source_path, &request.text)
        .await?;

    if outcome.is_skipped() {
        tracing::info!("Source already ingested: {}", request.source_path);
    } else {
        tracing::info!(
            "Ingested {} ({} chunks) in {}ms",
            request.source_path,
            outcome.chunks_added(),
            start.elapsed().as_millis()
        );
    }

    Ok(Json(IngestResponse {
        source_path: request.source_path,
        chunks_added: outcome.chunks_added(),
        skipped: outcome.is_skipped(),
    }))
}
