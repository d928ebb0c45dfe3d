//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON-body HTTP response
//! with an appropriate status code.
//!
//! Upstream model-service errors are logged with full detail but only a
//! generic message is returned to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tactical_core::CoachError;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the tactical-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from tactical-core.
    #[error("coach error: {0}")]
    Core(#[from] CoachError),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),

            ServerError::Core(e @ CoachError::UnsupportedImage(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ServerError::Core(e) => {
                error!(error = %e, "coach error");
                (StatusCode::BAD_GATEWAY, "upstream model service error".to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ServerError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        ServerError::BadRequest(format!("malformed upload: {e}"))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
