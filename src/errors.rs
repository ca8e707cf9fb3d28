use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures raised by the retrieval-augmentation core.
///
/// Remote-call errors are never retried here; they propagate typed so the
/// API layer can decide retry/fallback policy. `Timeout` is kept distinct
/// from the other transport failures because callers may retry timeouts but
/// not invalid requests.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("embedding request failed: {0}")]
    Embedding(String),
    #[error("indexing failed: {0}")]
    Indexing(String),
    #[error("search failed: {0}")]
    Search(String),
    #[error("generation request failed: {0}")]
    Generation(String),
    #[error("document extraction failed: {0}")]
    Extraction(String),
    #[error("object storage fetch failed: {0}")]
    Storage(String),
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RagError {
    /// Classify a reqwest failure for `operation`: timeouts get their own
    /// variant, everything else goes through `ctor`.
    pub fn from_transport(
        operation: &'static str,
        seconds: u64,
        err: reqwest::Error,
        ctor: fn(String) -> RagError,
    ) -> Self {
        if err.is_timeout() {
            RagError::Timeout { operation, seconds }
        } else {
            ctor(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream timeout: {0}")]
    GatewayTimeout(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::InvalidInput(msg) => ApiError::BadRequest(msg),
            RagError::NotFound(msg) => ApiError::NotFound(msg),
            RagError::Timeout { .. } => ApiError::GatewayTimeout(err.to_string()),
            RagError::Embedding(_)
            | RagError::Indexing(_)
            | RagError::Search(_)
            | RagError::Generation(_)
            | RagError::Storage(_) => ApiError::Upstream(err.to_string()),
            RagError::Extraction(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg.clone()),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_gateway_timeout() {
        let err = RagError::Timeout {
            operation: "search",
            seconds: 30,
        };
        match ApiError::from(err) {
            ApiError::GatewayTimeout(msg) => assert!(msg.contains("search")),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn missing_document_maps_to_not_found() {
        let err = RagError::NotFound("abc123".to_string());
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
    }

    #[test]
    fn remote_failures_map_to_upstream() {
        for err in [
            RagError::Embedding("boom".into()),
            RagError::Search("boom".into()),
            RagError::Generation("boom".into()),
        ] {
            assert!(matches!(ApiError::from(err), ApiError::Upstream(_)));
        }
    }
}
