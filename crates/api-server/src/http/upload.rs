use axum::Json;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Extension, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::UploadResponse;
use tracing::{debug, info};

use super::AppState;
use super::errors::{bad_request_response, payload_too_large_response, upload_failure_response};
use super::observability::RequestContext;

const FILE_FIELD: &str = "file";
const NO_FILE_MESSAGE: &str = "No file uploaded";

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

pub(super) async fn upload_attachment(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(request_id = %context.request_id, "rejected upload body: {rejection}");
            return bad_request_response(NO_FILE_MESSAGE);
        }
    };

    let file = match read_file_field(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return bad_request_response(NO_FILE_MESSAGE),
        Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return payload_too_large_response(state.max_upload_bytes);
        }
        Err(err) => {
            debug!(request_id = %context.request_id, "malformed multipart body: {err}");
            return bad_request_response(NO_FILE_MESSAGE);
        }
    };

    if file.bytes.len() > state.max_upload_bytes {
        return payload_too_large_response(state.max_upload_bytes);
    }

    match state
        .attachments
        .store(&file.file_name, file.content_type.as_deref(), file.bytes)
        .await
    {
        Ok(reference) => {
            info!(
                request_id = %context.request_id,
                file_name = %reference.source_name,
                "attachment relayed"
            );
            let message = reference.to_user_message();
            Json(UploadResponse {
                file_url: reference.public_url,
                file_name: reference.source_name,
                message,
            })
            .into_response()
        }
        Err(err) => upload_failure_response(&context.request_id, err),
    }
}

/// Returns the first `file` part. A part with neither a file name nor any
/// content is what browsers send when nothing was selected.
async fn read_file_field(
    multipart: &mut Multipart,
) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file = read_field(field).await?;
        if file.file_name.is_empty() && file.bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some(file));
    }

    Ok(None)
}

async fn read_field(field: Field<'_>) -> Result<UploadedFile, MultipartError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await?.to_vec();

    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}
