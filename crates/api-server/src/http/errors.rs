use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::attachments::UploadError;
use shared::llm::LlmGatewayError;
use shared::models::ErrorResponse;
use tracing::error;

const CHAT_FAILURE_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";
const UPLOAD_FAILURE_MESSAGE: &str = "Upload failed. Please try uploading again.";

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub(super) fn bad_request_response(message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, message)
}

pub(super) fn payload_too_large_response(max_upload_bytes: usize) -> Response {
    error_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &format!("File is too large; the limit is {max_upload_bytes} bytes"),
    )
}

pub(super) fn chat_failure_response(request_id: &str, err: LlmGatewayError) -> Response {
    error!(request_id, "chat turn failed: {err}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILURE_MESSAGE)
}

pub(super) fn upload_failure_response(request_id: &str, err: UploadError) -> Response {
    error!(request_id, "attachment upload failed: {err}");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILURE_MESSAGE)
}
