use std::env;
use std::fs;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Shared secret gating the admin HTTP routes (config, uploads, search).
#[derive(Debug, Clone)]
pub struct AdminToken {
    value: String,
}

impl AdminToken {
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Resolves the admin token: `ADMIN_TOKEN` env var wins, otherwise a token
/// is generated once and persisted user-readable-only next to the data dir.
pub fn init_admin_token(paths: &AppPaths) -> AdminToken {
    if let Ok(token) = env::var("ADMIN_TOKEN") {
        if !token.trim().is_empty() {
            return AdminToken { value: token };
        }
    }

    let token_path = paths.user_data_dir.join(".admin_token");
    if let Ok(existing) = fs::read_to_string(&token_path) {
        let existing = existing.trim().to_string();
        if !existing.is_empty() {
            return AdminToken { value: existing };
        }
    }

    let token = format!("{}{}", Uuid::new_v4(), Uuid::new_v4());
    if let Some(parent) = token_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(err) = fs::write(&token_path, &token) {
        tracing::warn!("Failed to persist admin token: {}", err);
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(&token_path) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            let _ = fs::set_permissions(&token_path, perms);
        }
    }

    AdminToken { value: token }
}

pub fn require_admin_key(headers: &HeaderMap, expected: &AdminToken) -> Result<(), ApiError> {
    let header_value = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header_value.is_empty() {
        return Err(ApiError::Unauthorized);
    }

    if header_value != expected.value() {
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn token(value: &str) -> AdminToken {
        AdminToken {
            value: value.to_string(),
        }
    }

    #[test]
    fn require_admin_key_accepts_valid_header() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static("secret"));

        assert!(require_admin_key(&headers, &token("secret")).is_ok());
    }

    #[test]
    fn require_admin_key_rejects_missing_header() {
        let headers = HeaderMap::new();
        let result = require_admin_key(&headers, &token("secret"));
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[test]
    fn require_admin_key_rejects_wrong_value() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_KEY_HEADER, HeaderValue::from_static("nope"));

        let result = require_admin_key(&headers, &token("secret"));
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }
}
