mod support;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::json;
use shared::lead::LeadProfile;
use shared::models::Role;

use support::{
    MemoryBlobStore, RecordingNotifier, ScriptedGateway, build_test_app, chat_request, send,
};

const COMPLETE_REPLY: &str = "Perfect, thanks Ann! Our team will be in touch.\n\n```json\n{\"collected_data\": {\"name\": \"Ann Lee\", \"email\": \"ann@acme.io\", \"company\": \"Acme\", \"use_case\": \"support automation\"}}\n```";

#[tokio::test]
async fn incomplete_turn_returns_reply_verbatim() {
    let app = build_test_app(
        LeadProfile::LeadCapture,
        ScriptedGateway::replying(&["Nice to meet you, Ann! What's your email?"]),
        RecordingNotifier::default(),
        MemoryBlobStore::default(),
    );

    let response = send(
        &app.router,
        chat_request(json!([
            { "role": "assistant", "content": "Hi! What's your name?" },
            { "role": "user", "content": "Ann" }
        ])),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({ "content": "Nice to meet you, Ann! What's your email?" })
    );
    assert!(response.request_id.is_some());
    assert!(app.notifier.records.lock().unwrap().is_empty());

    let requests = app.gateway.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 3);
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert_eq!(requests[0].messages[2].content, "Ann");
}

#[tokio::test]
async fn completed_turn_strips_block_and_dispatches_record() {
    let app = build_test_app(
        LeadProfile::LeadCapture,
        ScriptedGateway::replying(&[COMPLETE_REPLY]),
        RecordingNotifier::default(),
        MemoryBlobStore::default(),
    );

    let response = send(
        &app.router,
        chat_request(json!([
            { "role": "user", "content": "ann@acme.io, Acme, support automation" }
        ])),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({ "content": "Perfect, thanks Ann! Our team will be in touch." })
    );

    let records = app.notifier.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("email"), Some("ann@acme.io"));
    assert_eq!(records[0].get("company"), Some("Acme"));
}

#[tokio::test]
async fn completed_turn_carries_redirect_url() {
    let reply = "Thanks! Starting your interview now.\n```json\n{\"collected_data\": {\"name\": \"Ann\", \"email\": \"ann@acme.io\", \"job_role\": \"Backend Engineer\", \"resume_url\": \"https://public.blob.test/resume-1.pdf\"}}\n```";
    let app = build_test_app(
        LeadProfile::InterviewOnboarding,
        ScriptedGateway::replying(&[reply]),
        RecordingNotifier {
            redirect: Some("https://interview.example.com/session/7".to_string()),
            ..RecordingNotifier::default()
        },
        MemoryBlobStore::default(),
    );

    let response = send(
        &app.router,
        chat_request(json!([
            { "role": "user", "content": "[User uploaded resume: https://public.blob.test/resume-1.pdf]" }
        ])),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.body,
        json!({
            "content": "Thanks! Starting your interview now.",
            "redirectUrl": "https://interview.example.com/session/7"
        })
    );
    let records = app.notifier.records.lock().unwrap();
    assert_eq!(
        records[0].get("resume_url"),
        Some("https://public.blob.test/resume-1.pdf")
    );
}

#[tokio::test]
async fn malformed_block_is_treated_as_an_ordinary_reply() {
    let reply = "Almost done!\n```json\n{\"collected_data\": {\"name\": \"Ann\"\n```";
    let app = build_test_app(
        LeadProfile::LeadCapture,
        ScriptedGateway::replying(&[reply]),
        RecordingNotifier::default(),
        MemoryBlobStore::default(),
    );

    let response = send(
        &app.router,
        chat_request(json!([{ "role": "user", "content": "Ann" }])),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["content"], reply);
    assert!(response.body.get("redirectUrl").is_none());
    assert!(app.notifier.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn provider_failure_returns_apologetic_error() {
    let app = build_test_app(
        LeadProfile::LeadCapture,
        ScriptedGateway::failing(),
        RecordingNotifier::default(),
        MemoryBlobStore::default(),
    );

    let response = send(
        &app.router,
        chat_request(json!([{ "role": "user", "content": "hello" }])),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.body,
        json!({ "error": "Sorry, I encountered an error. Please try again." })
    );
}

#[tokio::test]
async fn invalid_body_is_rejected_without_calling_provider() {
    let app = build_test_app(
        LeadProfile::LeadCapture,
        ScriptedGateway::replying(&["unused"]),
        RecordingNotifier::default(),
        MemoryBlobStore::default(),
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"messages": [{"role": "robot", "content": "hi"}]}"#))
        .expect("request should build");
    let response = send(&app.router, request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
    assert!(app.gateway.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn caller_request_id_is_echoed_and_health_probe_answers() {
    let app = build_test_app(
        LeadProfile::LeadCapture,
        ScriptedGateway::default(),
        RecordingNotifier::default(),
        MemoryBlobStore::default(),
    );

    let request = Request::builder()
        .method(Method::GET)
        .uri("/healthz")
        .header("x-request-id", "widget-req-1")
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app.router, request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "ok": true }));
    assert_eq!(response.request_id.as_deref(), Some("widget-req-1"));
}
