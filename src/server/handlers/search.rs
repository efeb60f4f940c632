use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_admin_key;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub k: Option<usize>,
}

/// Admin view of retrieval: ranked matches for a query, using the
/// configured similarity threshold.
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin_key(&headers, &state.admin_token)?;

    if payload.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let rag = state.config.rag();
    let k = payload.k.unwrap_or(rag.top_k);
    let matches = state
        .retriever
        .retrieve(&payload.query, rag.similarity_threshold, k)
        .await?;

    let results: Vec<_> = matches
        .iter()
        .map(|m| {
            json!({
                "content": m.chunk.content,
                "source": m.chunk.source(),
                "score": m.score,
                "metadata": m.chunk.metadata,
            })
        })
        .collect();

    Ok(Json(json!({ "matches": results })))
}
