//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use quill_types::error::AdmissionError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Request validation failure.
    Validation(String),
    /// Admission control rejected the stream.
    TooManyStreams(AdmissionError),
    /// Unknown or empty conversation.
    CheckpointNotFound(String),
    /// Generic internal error.
    Internal(String),
}

impl From<AdmissionError> for AppError {
    fn from(e: AdmissionError) -> Self {
        AppError::TooManyStreams(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::TooManyStreams(e) => {
                (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_STREAMS", e.to_string())
            }
            AppError::CheckpointNotFound(id) => (
                StatusCode::NOT_FOUND,
                "CHECKPOINT_NOT_FOUND",
                format!("No conversation found for checkpoint '{id}'"),
            ),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone())
            }
        };

        let body = json!({
            "data": null,
            "meta": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
