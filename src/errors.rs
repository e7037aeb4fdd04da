use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("product catalog not found: {0}")]
    CatalogNotFound(String),
    #[error("malformed product catalog: {0}")]
    MalformedCatalog(String),
    #[error("product catalog is empty")]
    EmptyCatalog,
    #[error("invalid product at index {index}: missing {field}")]
    InvalidProduct { index: usize, field: &'static str },
    #[error("no vector index persisted at {0}")]
    IndexNotFound(String),
    #[error("vector store not initialized, call initialize() first")]
    NotInitialized,
    #[error("{capability} call failed: {message}")]
    ExternalCapability {
        capability: &'static str,
        message: String,
    },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        ApiError::ExternalCapability {
            capability: "embedding",
            message: err.to_string(),
        }
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        ApiError::ExternalCapability {
            capability: "generation",
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::CatalogNotFound(_) | ApiError::IndexNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MalformedCatalog(_)
            | ApiError::EmptyCatalog
            | ApiError::InvalidProduct { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ExternalCapability { .. } => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
