//! Request-level error taxonomy.
//!
//! Everything recoverable degrades locally (neutral profile, keyword
//! fallback, empty lane); only the cases below surface to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommendError {
    /// The query text was empty or whitespace-only. Rejected before any
    /// network call.
    #[error("Query cannot be empty")]
    InvalidQuery,

    /// The catalog collaborator is failing broadly; neither lane can
    /// function, so the whole request fails.
    #[error("Catalog service unavailable")]
    CatalogUnavailable,
}

impl RecommendError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RecommendError::InvalidQuery => StatusCode::BAD_REQUEST,
            RecommendError::CatalogUnavailable => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RecommendError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            RecommendError::InvalidQuery.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RecommendError::CatalogUnavailable.status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
