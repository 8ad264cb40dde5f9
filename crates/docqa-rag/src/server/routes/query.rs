//! Search, answer, and stats endpoints

use axum::{extract::State, Json};
use std::time::Instant;

use crate::server::state::AppState;
use crate::types::{Answer, AnswerRequest, KnowledgeStats, SearchRequest, SearchResponse};

/// POST /api/search - Ranked chunks for a query
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let k = request.top_k.unwrap_or(state.config().retrieval.top_k);
    let results = state.service().search(&request.query, k).await;

    Json(SearchResponse {
        results: results.into_iter().map(Into::into).collect(),
    })
}

/// POST /api/answer - Grounded answer for a question
pub async fn answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Json<Answer> {
    let start = Instant::now();
    tracing::info!("Query: \"{}\"", request.query);

    let answer = state.service().answer(&request.query).await;

    tracing::info!(
        "Answered in {}ms (fallback: {}, sources: {})",
        start.elapsed().as_millis(),
        answer.used_fallback,
        answer.sources.len()
    );

    Json(answer)
}

/// GET /api/stats - Corpus statistics
pub async fn stats(State(state): State<AppState>) -> Json<KnowledgeStats> {
    Json(state.service().stats())
}
