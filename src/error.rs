// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (validation failures, cross-quiz id injection)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found (also covers rows owned by another user)
    NotFound(String),

    // 409 Conflict: an in-progress attempt already exists for this quiz.
    // Carries the existing attempt id so the client can resume it.
    DuplicateAttempt { attempt_id: i64 },

    // 400 with progress counts: completion requested before every question
    // of the attempt has a recorded answer.
    IncompleteAttempt { answered: i64, total: i64 },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::DuplicateAttempt { attempt_id } => (
                StatusCode::CONFLICT,
                json!({
                    "error": "You have an incomplete attempt for this quiz",
                    "attempt_id": attempt_id,
                }),
            ),
            AppError::IncompleteAttempt { answered, total } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Please answer all questions before completing the quiz",
                    "answered": answered,
                    "total": total,
                }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
