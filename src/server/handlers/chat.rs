use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::state::AppState;
use crate::types::{ConversationTurn, SourceCitation};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<ConversationTurn>,
    pub max_results: Option<i64>,
    #[allow(dead_code)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub sources: Vec<SourceCitation>,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }

    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "Chat request ({} history turns)", request.chat_history.len());

    let response = state
        .rag
        .generate_response(
            &request.message,
            &request.chat_history,
            request.max_results,
        )
        .await?;

    tracing::info!(
        %request_id,
        "Chat response with {} sources, confidence {:.2}",
        response.sources.len(),
        response.confidence
    );

    Ok(Json(ChatResponse {
        message: response.answer,
        sources: response.sources,
        confidence: response.confidence,
        timestamp: response.timestamp,
    }))
}
