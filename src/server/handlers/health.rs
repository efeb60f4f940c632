use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_admin_key;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin_key(&headers, &state.admin_token)?;

    let provider_reachable = state.provider.health_check().await.unwrap_or(false);
    let chunk_count = state.rag_store.count_chunks().await.unwrap_or(0);
    let memory_messages = state.memory.count().await.unwrap_or(0);

    Ok(Json(json!({
        "status": "ok",
        "provider": state.provider.name(),
        "provider_reachable": provider_reachable,
        "chunks": chunk_count,
        "memory_messages": memory_messages,
        "ingest_pending": state.ingest_queue.pending(),
        "ingest_in_flight": state.ingest_queue.in_flight(),
    })))
}
