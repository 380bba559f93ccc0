use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_REQUEST_ID_LEN: usize = 128;

/// Per-request id, echoed on every response so widget logs and server logs
/// can be joined.
#[derive(Clone, Debug)]
pub(crate) struct RequestContext {
    pub(crate) request_id: String,
}

pub(crate) async fn request_observability_middleware(mut req: Request, next: Next) -> Response {
    let request_id =
        caller_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let span = info_span!(
        "widget_request",
        request_id = %request_id,
        method = %req.method(),
        route = %route,
    );
    req.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let started_at = Instant::now();
    let mut response = next.run(req).instrument(span.clone()).await;
    let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }

    let status = response.status();
    span.in_scope(|| {
        if status.is_server_error() {
            warn!(status = status.as_u16(), latency_ms, "request failed");
        } else if status.is_client_error() {
            info!(status = status.as_u16(), latency_ms, "request rejected");
        } else {
            info!(status = status.as_u16(), latency_ms, "request served");
        }
    });

    response
}

/// Accepts a caller-supplied id only when it is short and made of
/// `[A-Za-z0-9._-]`.
fn caller_request_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(&REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    let acceptable = !raw.is_empty()
        && raw.len() <= MAX_REQUEST_ID_LEN
        && raw
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
    acceptable.then(|| raw.to_owned())
}
