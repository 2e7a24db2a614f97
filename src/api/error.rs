//! Shared error handling for API endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;
use crate::validate::ValidationError;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, context: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal(context, e))
    }
}

/// API error type with automatic response conversion.
///
/// Whatever goes wrong, the client sees one envelope:
/// `{"error": {"message": ..., "status": ...}}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    TooManyRequests(String),
    Internal,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn too_many_requests(msg: impl Into<String>) -> Self {
        Self::TooManyRequests(msg.into())
    }

    /// Logs the cause at error level and hands the client a fixed
    /// message; internal details never reach the wire.
    pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal
    }

    fn parts(self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, msg),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error.".into(),
            ),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::DuplicateUsername(_) | AuthError::DuplicateEmail(_) => {
                Self::BadRequest(e.to_string())
            }
            AuthError::UserNotFound
            | AuthError::InvalidPassword
            | AuthError::MissingRefreshToken
            | AuthError::InvalidToken
            | AuthError::TokenRevoked => Self::Unauthorized(e.to_string()),
            AuthError::UnknownUser(_) => Self::NotFound(e.to_string()),
            AuthError::Token(_) | AuthError::Storage(_) | AuthError::Hashing(_) => {
                Self::internal("auth operation failed", e)
            }
        }
    }
}

/// Unwraps an optional JSON request body. An absent body reads as JSON
/// `null`; malformed JSON becomes a 400 in the regular envelope.
pub fn json_body(
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<serde_json::Value, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(serde_json::Value::Null),
        Err(rejection) => Err(ApiError::bad_request(rejection.body_text())),
    }
}

/// String field lookup treating empty strings and non-strings as absent.
pub fn str_field<'a>(body: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.is_empty())
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    status: u16,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.parts();
        let body = ErrorResponse {
            error: ErrorBody {
                message,
                status: status.as_u16(),
            },
        };
        (status, Json(body)).into_response()
    }
}
