#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use api_server::http::{AppState, build_router};
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use shared::attachments::{AttachmentRelay, BlobPutFuture, BlobStore, UploadError};
use shared::lead::{
    CollectedRecord, ConversationOrchestrator, LeadNotifier, LeadProfile, NotifyFuture,
};
use shared::llm::{
    ChatCompletion, ChatCompletionRequest, LlmGateway, LlmGatewayError, LlmGatewayFuture,
};
use tower::ServiceExt;

pub const MULTIPART_BOUNDARY: &str = "lead-intake-test-boundary";
pub const MAX_UPLOAD_BYTES: usize = 1024;

/// Gateway that answers each call with the next scripted reply.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, LlmGatewayError>>>,
    pub requests: Mutex<Vec<ChatCompletionRequest>>,
}

impl ScriptedGateway {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|reply| Ok(reply.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(LlmGatewayError::Timeout)])),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl LlmGateway for ScriptedGateway {
    fn complete<'a>(&'a self, request: ChatCompletionRequest) -> LlmGatewayFuture<'a> {
        Box::pin(async move {
            self.requests.lock().expect("lock").push(request);
            let reply = self
                .replies
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| {
                    Err(LlmGatewayError::ProviderFailure(
                        "exhausted_test_replies".to_string(),
                    ))
                })?;
            Ok(ChatCompletion {
                model: "scripted".to_string(),
                provider_request_id: None,
                content: reply,
                usage: None,
            })
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub redirect: Option<String>,
    pub records: Mutex<Vec<CollectedRecord>>,
}

impl LeadNotifier for RecordingNotifier {
    fn notify<'a>(&'a self, record: &'a CollectedRecord) -> NotifyFuture<'a> {
        Box::pin(async move {
            self.records.lock().expect("lock").push(record.clone());
            self.redirect.clone()
        })
    }
}

/// In-memory blob store; `fail` makes every put report storage as unreachable.
#[derive(Default)]
pub struct MemoryBlobStore {
    pub fail: bool,
    pub objects: Mutex<Vec<(String, Option<String>, Vec<u8>)>>,
}

impl BlobStore for MemoryBlobStore {
    fn put<'a>(
        &'a self,
        pathname: &'a str,
        content_type: Option<&'a str>,
        bytes: Vec<u8>,
    ) -> BlobPutFuture<'a> {
        Box::pin(async move {
            if self.fail {
                return Err(UploadError::Unavailable("connection refused".to_string()));
            }
            self.objects.lock().expect("lock").push((
                pathname.to_string(),
                content_type.map(str::to_string),
                bytes,
            ));
            Ok(format!("https://public.blob.test/{pathname}"))
        })
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub gateway: Arc<ScriptedGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub blob_store: Arc<MemoryBlobStore>,
}

pub fn build_test_app(
    profile: LeadProfile,
    gateway: ScriptedGateway,
    notifier: RecordingNotifier,
    blob_store: MemoryBlobStore,
) -> TestApp {
    let gateway = Arc::new(gateway);
    let notifier = Arc::new(notifier);
    let blob_store = Arc::new(blob_store);

    let orchestrator = ConversationOrchestrator::new(
        gateway.clone(),
        notifier.clone(),
        profile.schema(),
        profile.default_preamble(),
    );
    let router = build_router(AppState {
        orchestrator: Arc::new(orchestrator),
        attachments: AttachmentRelay::new(blob_store.clone()),
        max_upload_bytes: MAX_UPLOAD_BYTES,
    });

    TestApp {
        router,
        gateway,
        notifier,
        blob_store,
    }
}

pub struct JsonResponse {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: Value,
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> JsonResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let request_id = response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let body = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| json!({}));

    JsonResponse {
        status,
        request_id,
        body,
    }
}

pub fn chat_request(messages: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "messages": messages }).to_string()))
        .expect("request should build")
}

/// Builds a multipart request with one part per `(field, file_name, bytes)`.
pub fn upload_request(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (field, file_name, bytes) in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => {
                format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            }
            None => format!("Content-Disposition: form-data; name=\"{field}\"\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        if file_name.is_some() {
            body.extend_from_slice(b"Content-Type: application/pdf\r\n");
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request should build")
}
