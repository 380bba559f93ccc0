use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::blob_store::{BlobStore, UploadError};
use crate::models::ChatMessage;

const FALLBACK_FILE_NAME: &str = "attachment";
const UPLOAD_MARKER_PREFIX: &str = "[User uploaded resume:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentReference {
    pub source_name: String,
    pub public_url: String,
}

impl AttachmentReference {
    /// Synthetic user turn the client appends so the provider can pick the
    /// URL up as the attachment field.
    pub fn to_user_message(&self) -> ChatMessage {
        ChatMessage::user(format!("{UPLOAD_MARKER_PREFIX} {}]", self.public_url))
    }

    /// Returns the URL carried by a tagged upload message, if `text` is one.
    pub fn parse_marker(text: &str) -> Option<&str> {
        let url = text
            .trim()
            .strip_prefix(UPLOAD_MARKER_PREFIX)?
            .strip_suffix(']')?
            .trim();
        (!url.is_empty()).then_some(url)
    }
}

#[derive(Clone)]
pub struct AttachmentRelay {
    store: Arc<dyn BlobStore>,
}

impl AttachmentRelay {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub async fn store(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<AttachmentReference, UploadError> {
        let source_name = display_name(file_name);
        let pathname = unique_pathname(&source_name, Uuid::new_v4());
        info!(
            file_name = %source_name,
            size_bytes = bytes.len(),
            "uploading attachment to blob storage"
        );

        match self.store.put(&pathname, content_type, bytes).await {
            Ok(public_url) => {
                info!(file_name = %source_name, url = %public_url, "attachment uploaded");
                Ok(AttachmentReference {
                    source_name,
                    public_url,
                })
            }
            Err(err) => {
                warn!(file_name = %source_name, "attachment upload failed: {err}");
                Err(err)
            }
        }
    }
}

fn display_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        base.to_string()
    }
}

/// `resume.pdf` becomes `resume-<suffix>.pdf`; names that are not URL-path
/// friendly are reduced to `[A-Za-z0-9._-]`.
fn unique_pathname(source_name: &str, nonce: Uuid) -> String {
    let sanitized = source_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '-'
            }
        })
        .collect::<String>();

    let suffix = nonce.simple().to_string();
    match sanitized.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => {
            format!("{stem}-{suffix}.{extension}")
        }
        _ => format!("{sanitized}-{suffix}"),
    }
}
