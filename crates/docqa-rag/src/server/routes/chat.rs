//! Conversational endpoint

use axum::{extract::State, Json};

use crate::server::state::AppState;
use crate::types::{ChatRequest, ChatResponse};

/// POST /api/chat - Classify a message and reply
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let response = state.service().chat(&request.message).await;
    tracing::debug!("Chat intent: {:?}", response.intent);
    Json(response)
}
