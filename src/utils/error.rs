//! Error types shared across the relay.
//!
//! `StoreError` covers the persistence collaborators. `AppError` is the
//! request-facing taxonomy: it is what handlers return and what the axum
//! layer turns into a status code plus a small JSON body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failures raised by a comment store or identity backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded database rejected an operation.
    #[error("storage backend error: {0}")]
    Sled(#[from] sled::Error),

    /// A stored record could not be encoded or decoded.
    #[error("record codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The topic identifier cannot be used as a storage key.
    #[error("invalid topic identifier: {0:?}")]
    InvalidTopic(String),

    /// The store call never completed, e.g. its blocking task panicked.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("topic {0} not found")]
    NotFound(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(err) => {
                tracing::error!(error = %err, "storage failure while handling request");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
