//! # Application Error
//!
//! Maps domain errors to structured HTTP responses with proper
//! status codes and error bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-level error type that maps to HTTP responses.
///
/// Every operation reports failures through this taxonomy so callers can
/// distinguish error kinds by status code without parsing messages.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Known user, wrong password.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Missing, invalid, or expired session token.
    #[error("unauthorized: {0}")]
    Authentication(String),

    /// Authenticated, but insufficient role.
    #[error("forbidden: {0}")]
    Authorization(String),

    /// No matching record.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness violation or invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Upload exceeds the size policy.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Upload extension outside the allowed set.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Datastore or storage failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials(_) => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": {
                "code": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    /// Collapses datastore failures into the taxonomy. Unique-constraint hits
    /// (duplicate username/email) surface as Conflict; everything else is an
    /// internal error whose detail stays in the logs, not the response.
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::NotFound("record not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::Conflict("duplicate value for a unique field".to_string())
            }
            _ => {
                tracing::error!("database error: {:?}", err);
                ApiError::Internal("database error".to_string())
            }
        }
    }
}
