use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::response::{IntoResponse, Response};
use shared::models::{ChatTurnRequest, ChatTurnResponse};
use tracing::{debug, info};

use super::AppState;
use super::errors::{bad_request_response, chat_failure_response};
use super::observability::RequestContext;

pub(super) async fn chat_turn(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<ChatTurnRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(request_id = %context.request_id, "rejected chat body: {rejection}");
            return bad_request_response("Invalid chat request body");
        }
    };

    match state.orchestrator.respond(&request.messages).await {
        Ok(outcome) => {
            info!(
                request_id = %context.request_id,
                history_len = request.messages.len(),
                completed = outcome.completed,
                redirect = outcome.redirect_url.is_some(),
                "chat turn answered"
            );
            Json(ChatTurnResponse {
                content: outcome.content,
                redirect_url: outcome.redirect_url,
            })
            .into_response()
        }
        Err(err) => chat_failure_response(&context.request_id, err),
    }
}
