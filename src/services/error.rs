//! Error handling for route handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routes::songs::dto::Message;
use crate::services::db::RepositoryError;

/// Errors a handler can return; rendered as a `{ ok: false, msg }` body
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or out-of-range request parameters
    #[error("{0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound | ApiError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ApiError::Repository(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let msg = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::NotFound | ApiError::Repository(RepositoryError::NotFound) => {
                "not found".to_string()
            }
            ApiError::Repository(err) => {
                // Connectivity failures are opaque to clients
                tracing::error!(error = %err, "repository call failed");
                "something went wrong".to_string()
            }
        };

        (status, Json(Message::error(msg))).into_response()
    }
}
