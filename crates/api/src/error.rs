//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::CompanyError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Error reported by the company service.
    Company(CompanyError),
    /// Body could not be decoded into the expected payload.
    InvalidInput(String),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Company(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                if status.is_server_error() {
                    tracing::error!(error = %err, kind = %err.kind(), "request failed");
                }
                (status, serde_json::json!({ "error": err.to_string() }))
            }
            ApiError::InvalidInput(details) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "Invalid input data", "details": details }),
            ),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, serde_json::json!({ "error": msg }))
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<CompanyError> for ApiError {
    fn from(err: CompanyError) -> Self {
        ApiError::Company(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidInput(rejection.body_text())
    }
}
