//! Error types for the artifact-dl server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure of one resolution stage.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The upstream API answered with a non-success status.
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The request never produced a status (DNS, TLS, connection reset, ...).
    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A 2xx response without the payload we asked for.
    #[error("Unexpected upstream response: {0}")]
    InvalidResponse(String),

    /// The upstream call succeeded but nothing in it matched.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// The upstream client could not be constructed.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Token is not a valid header value")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// A required root-form field is absent or empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Missing input field: {0}")]
pub struct MissingInput(pub &'static str);

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Resolve(ResolveError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, msg).into_response()
            }
            AppError::Resolve(e) => {
                tracing::error!("Upstream failure: {}", e);
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
