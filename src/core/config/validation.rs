use serde_json::{Map, Value};

use crate::core::errors::ApiError;

/// Rejects configuration payloads that would leave the service in a broken
/// state. Only fields that are present are checked; sections may be omitted.
pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_u64_field(server, "server.port", "port", 1, 65_535)?;
    }

    if let Some(assistant) = expect_optional_object(root, "assistant")? {
        validate_u64_field(assistant, "assistant.memory_limit", "memory_limit", 1, 1_000)?;
    }

    if let Some(rag) = expect_optional_object(root, "rag")? {
        validate_u64_field(rag, "rag.chunk_size", "chunk_size", 1, 1_000_000)?;
        validate_u64_field(rag, "rag.top_k", "top_k", 1, 1_000)?;
        validate_u64_field(rag, "rag.queue_capacity", "queue_capacity", 1, 100_000)?;
        validate_u64_field(rag, "rag.workers", "workers", 1, 256)?;

        if let Some(threshold) = rag.get("similarity_threshold") {
            let threshold = threshold
                .as_f64()
                .ok_or_else(|| config_type_error("rag.similarity_threshold", "number"))?;
            if !(-1.0..=1.0).contains(&threshold) {
                return Err(ApiError::BadRequest(
                    "rag.similarity_threshold must be between -1.0 and 1.0".to_string(),
                ));
            }
        }

        let chunk_size = rag.get("chunk_size").and_then(Value::as_u64);
        let overlap = rag.get("chunk_overlap").and_then(Value::as_u64);
        if let (Some(size), Some(overlap)) = (chunk_size, overlap) {
            if overlap >= size {
                return Err(ApiError::BadRequest(
                    "rag.chunk_overlap must be smaller than rag.chunk_size".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };

    let value = value
        .as_u64()
        .ok_or_else(|| config_type_error(path, "positive integer"))?;

    if value < min || value > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be between {} and {}",
            path, min, max
        )));
    }

    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!("{} must be a {}", path, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_config() {
        assert!(validate_config(&json!({})).is_ok());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let config = json!({ "rag": { "chunk_size": 200, "chunk_overlap": 200 } });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = json!({ "rag": { "similarity_threshold": 1.5 } });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_zero_port() {
        let config = json!({ "server": { "port": 0 } });
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn accepts_valid_rag_section() {
        let config = json!({
            "rag": {
                "chunk_size": 1000,
                "chunk_overlap": 200,
                "top_k": 5,
                "similarity_threshold": 0.5
            }
        });
        assert!(validate_config(&config).is_ok());
    }
}
