use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub channel_id: Option<String>,
    pub message: String,
}

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }

    let reply = state
        .chat
        .respond(payload.channel_id.as_deref(), &payload.message)
        .await?;

    Ok(Json(json!({ "reply": reply })))
}
