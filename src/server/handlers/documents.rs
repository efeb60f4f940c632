use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::core::security::require_admin_key;
use crate::rag::{IngestJob, UploadStatus};
use crate::state::AppState;

/// Accepts a multipart document upload, creates the upload row and queues
/// the ingestion job. The caller gets a 202 immediately; progress is
/// visible via the upload's status.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    require_admin_key(&headers, &state.admin_token)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("invalid multipart payload: {}", err)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file field is missing a filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(format!("failed to read file field: {}", err)))?;

        file = Some((filename, bytes.to_vec()));
        break;
    }

    let Some((filename, bytes)) = file else {
        return Err(ApiError::BadRequest(
            "multipart field 'file' is required".to_string(),
        ));
    };

    let upload_id = state.rag_store.create_upload(&filename).await?;

    let job = IngestJob {
        upload_id,
        filename,
        bytes,
    };
    if let Err(err) = state.ingest_queue.enqueue(job) {
        // The job never ran; close the upload out so its status is not
        // stuck at processing forever.
        if let Err(status_err) = state
            .rag_store
            .set_upload_status(upload_id, UploadStatus::Failed, Some(&err.to_string()))
            .await
        {
            tracing::error!(
                "Failed to mark refused upload {} as failed: {}",
                upload_id,
                status_err
            );
        }
        return Err(err);
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "status": "queued", "upload_id": upload_id })),
    ))
}

pub async fn list_uploads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    require_admin_key(&headers, &state.admin_token)?;

    let uploads = state.rag_store.list_uploads().await?;
    Ok(Json(json!({ "uploads": uploads })))
}

pub async fn get_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(upload_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin_key(&headers, &state.admin_token)?;

    let upload = state
        .rag_store
        .get_upload(upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload {}", upload_id)))?;

    Ok(Json(json!({ "upload": upload })))
}
