use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::attachments::AttachmentRelay;
use shared::lead::ConversationOrchestrator;

mod chat;
mod errors;
mod health;
mod observability;
mod upload;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub attachments: AttachmentRelay,
    pub max_upload_bytes: usize,
}

pub fn build_router(app_state: AppState) -> Router {
    let upload_body_limit = app_state
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/api/chat", post(chat::chat_turn))
        .route(
            "/api/upload",
            post(upload::upload_attachment).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
        .with_state(app_state)
}
