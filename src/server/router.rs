use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, config, documents, health, search};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Creates the application router.
///
/// - Health and chat are open; everything under the admin surface
///   (config, documents, search, status) requires the admin key header.
/// - CORS origins come from the server config section, with localhost
///   defaults for development.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route(
            "/api/config",
            get(config::get_config)
                .post(config::update_config)
                .patch(config::patch_config),
        )
        .route(
            "/api/documents",
            get(documents::list_uploads)
                .post(documents::upload_document)
                // Document uploads need more than the default 2 MB body cap.
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/documents/:upload_id", get(documents::get_upload))
        .route("/api/chat", post(chat::post_message))
        .route("/api/search", post(search::search))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let configured = state.config.server().cors_allowed_origins;
    let origins = if configured.is_empty() {
        default_local_origins()
    } else {
        configured
    };

    let allow_origin = AllowOrigin::list(
        origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect::<Vec<_>>(),
    );

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-admin-key"),
        ])
}

fn default_local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
        "http://127.0.0.1:8000".to_string(),
    ]
}
