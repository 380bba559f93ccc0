mod support;

use axum::http::StatusCode;
use serde_json::json;
use shared::lead::LeadProfile;

use support::{
    MAX_UPLOAD_BYTES, MemoryBlobStore, RecordingNotifier, ScriptedGateway, build_test_app, send,
    upload_request,
};

fn upload_app(blob_store: MemoryBlobStore) -> support::TestApp {
    build_test_app(
        LeadProfile::InterviewOnboarding,
        ScriptedGateway::default(),
        RecordingNotifier::default(),
        blob_store,
    )
}

#[tokio::test]
async fn upload_returns_public_url_name_and_tagged_message() {
    let app = upload_app(MemoryBlobStore::default());

    let response = send(
        &app.router,
        upload_request(&[("file", Some("resume.pdf"), b"%PDF-1.7 resume".as_slice())]),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["fileName"], "resume.pdf");
    let file_url = response.body["fileUrl"]
        .as_str()
        .expect("fileUrl should be a string");
    assert!(file_url.starts_with("https://public.blob.test/resume-"));
    assert!(file_url.ends_with(".pdf"));
    assert_eq!(
        response.body["message"],
        json!({
            "role": "user",
            "content": format!("[User uploaded resume: {file_url}]")
        })
    );

    let objects = app.blob_store.objects.lock().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].1.as_deref(), Some("application/pdf"));
    assert_eq!(objects[0].2, b"%PDF-1.7 resume".as_slice());
}

#[tokio::test]
async fn same_file_name_twice_yields_distinct_urls() {
    let app = upload_app(MemoryBlobStore::default());

    let first = send(
        &app.router,
        upload_request(&[("file", Some("resume.pdf"), b"first".as_slice())]),
    )
    .await;
    let second = send(
        &app.router,
        upload_request(&[("file", Some("resume.pdf"), b"second".as_slice())]),
    )
    .await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(second.status, StatusCode::OK);
    assert_ne!(first.body["fileUrl"], second.body["fileUrl"]);
    assert_eq!(first.body["fileName"], second.body["fileName"]);
}

#[tokio::test]
async fn other_fields_are_skipped_until_the_file_part() {
    let app = upload_app(MemoryBlobStore::default());

    let response = send(
        &app.router,
        upload_request(&[
            ("note", None, b"hello".as_slice()),
            ("file", Some("cv.docx"), b"docx bytes".as_slice()),
        ]),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["fileName"], "cv.docx");
}

#[tokio::test]
async fn missing_file_part_is_a_bad_request() {
    let app = upload_app(MemoryBlobStore::default());

    let response = send(&app.router, upload_request(&[("note", None, b"hello".as_slice())])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, json!({ "error": "No file uploaded" }));
    assert!(app.blob_store.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_file_selection_is_a_bad_request() {
    let app = upload_app(MemoryBlobStore::default());

    let response = send(&app.router, upload_request(&[("file", Some(""), b"".as_slice())])).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body, json!({ "error": "No file uploaded" }));
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let app = upload_app(MemoryBlobStore::default());
    let oversized = vec![b'x'; MAX_UPLOAD_BYTES + 1];

    let response = send(
        &app.router,
        upload_request(&[("file", Some("resume.pdf"), oversized.as_slice())]),
    )
    .await;

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response.body["error"].is_string());
    assert!(app.blob_store.objects.lock().unwrap().is_empty());
}

#[tokio::test]
async fn storage_failure_returns_retry_message() {
    let app = upload_app(MemoryBlobStore {
        fail: true,
        ..MemoryBlobStore::default()
    });

    let response = send(
        &app.router,
        upload_request(&[("file", Some("resume.pdf"), b"%PDF".as_slice())]),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.body,
        json!({ "error": "Upload failed. Please try uploading again." })
    );
}
