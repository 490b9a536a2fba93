use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::chat::ChatError;
use shared::models::ErrorResponse;
use tracing::error;

pub(super) fn bad_request_response(message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

pub(super) fn not_found_response(message: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, message)
}

pub(super) fn internal_error_response(message: &str) -> Response {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// Client-facing mapping for chat failures. Internal faults are logged here and
/// reported with `internal_message` only.
pub(super) fn chat_error_response(err: ChatError, internal_message: &str) -> Response {
    match err {
        ChatError::EmptyInput => bad_request_response("Message cannot be empty"),
        ChatError::TooLong { max_chars } => bad_request_response(&format!(
            "Message too long. Maximum {max_chars} characters allowed."
        )),
        ChatError::QuotaExceeded { max_turns } => bad_request_response(&format!(
            "Chat limit reached ({max_turns} messages). Please start a new chat."
        )),
        ChatError::NotFound => not_found_response("Chat not found"),
        other => {
            error!(error = %other, "chat operation failed");
            internal_error_response(internal_message)
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
