use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type PlantResult<T> = Result<T, PlantError>;

/// Errors raised by the plant lifecycle, accounts, store and scanner.
#[derive(Debug, Error)]
pub enum PlantError {
    /// Bad input to a create/configure operation. Nothing was written.
    #[error("{0}")]
    Validation(String),

    /// The record does not exist for this owner. Never says which.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

impl PlantError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        PlantError::Store(err.to_string())
    }
}

/// HTTP-facing error. Store and notification failures are reported without
/// detail; the cause is only logged.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    Conflict(String),
    InternalError,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<PlantError> for ApiError {
    fn from(err: PlantError) -> Self {
        match err {
            PlantError::Validation(msg) => ApiError::BadRequest(msg),
            PlantError::NotFound(_) => ApiError::NotFound(err.to_string()),
            PlantError::Conflict(msg) => ApiError::Conflict(msg),
            PlantError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            PlantError::Store(_) | PlantError::Notification(_) => {
                tracing::error!(error = %err, "Request failed");
                ApiError::InternalError
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error.to_string(),
            message,
        });
        (status, body).into_response()
    }
}
