//! JSON error responses.

use std::fmt::Display;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use claimflow_core::approval::{ApprovalError, ErrorKind};
use claimflow_shared::AppError;

/// Builds the error response for a workflow error, keeping its specific code.
pub fn approval_error_response(err: &ApprovalError) -> Response {
    respond(
        err.status_code(),
        err.error_code(),
        err,
        err.kind() == ErrorKind::Infrastructure,
    )
}

/// Builds the error response for an application error.
pub fn error_response(err: &AppError) -> Response {
    respond(
        err.status_code(),
        err.error_code(),
        err,
        matches!(err, AppError::Database(_) | AppError::Internal(_)),
    )
}

/// Builds a 400 response for a malformed request parameter.
pub fn bad_request(message: impl Into<String>) -> Response {
    error_response(&AppError::Validation(message.into()))
}

/// Builds a 403 response.
pub fn forbidden(message: impl Into<String>) -> Response {
    error_response(&AppError::Forbidden(message.into()))
}

/// Internal failures are logged and their details withheld from the client.
fn respond(status: u16, code: &str, err: &dyn Display, internal: bool) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let message = if internal {
        error!(error = %err, "Request failed");
        "An error occurred".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(json!({
            "error": code.to_ascii_lowercase(),
            "message": message,
        })),
    )
        .into_response()
}
