//! Integration tests for the fridge-ri HTTP API
//!
//! The extraction and record store clients are stubbed at their trait
//! seams; everything from the router down is the real service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::json;
use tower::util::ServiceExt;

use fridge_ri::config::Config;
use fridge_ri::models::{DraftItem, ExtractedItem};
use fridge_ri::services::{
    ExtractionError, ReceiptExtractor, RecordStoreError, RecordWriter, SessionController,
};
use fridge_ri::AppState;

const BOUNDARY: &str = "fridge-test-boundary";

fn sample_items() -> Vec<ExtractedItem> {
    vec![
        ExtractedItem {
            food: "Chicken Thighs".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(),
            cost: 8.22,
            notes: "6.37lb".to_string(),
        },
        ExtractedItem {
            food: "Whole Milk".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 3, 24).unwrap(),
            cost: 4.99,
            notes: String::new(),
        },
    ]
}

/// Extractor stub: replays queued outcomes, then falls back to the samples
struct StubExtractor {
    responses: Mutex<VecDeque<Result<Vec<ExtractedItem>, ExtractionError>>>,
}

impl StubExtractor {
    fn sampled() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
        })
    }

    fn scripted(responses: Vec<Result<Vec<ExtractedItem>, ExtractionError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl ReceiptExtractor for StubExtractor {
    async fn extract(
        &self,
        _pdf: &[u8],
        _reference_date: NaiveDate,
    ) -> Result<Vec<ExtractedItem>, ExtractionError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(sample_items()))
    }
}

/// Writer stub: records calls, fails for the listed foods
struct StubWriter {
    fail_foods: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl StubWriter {
    fn new() -> Arc<Self> {
        Self::failing(&[])
    }

    fn failing(foods: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fail_foods: foods.iter().map(|s| s.to_string()).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordWriter for StubWriter {
    async fn create_record(
        &self,
        item: &DraftItem,
        _submitter: &str,
    ) -> Result<(), RecordStoreError> {
        self.calls.lock().unwrap().push(item.food.clone());
        if self.fail_foods.contains(&item.food) {
            Err(RecordStoreError::ApiError(
                400,
                "validation_error: Expires is expected to be date".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

fn test_config() -> Config {
    Config {
        anthropic_api_key: "sk-test".to_string(),
        notion_token: "secret-token".to_string(),
        notion_database_id: "db-test".to_string(),
        extraction_model: "test-model".to_string(),
        submitters: vec!["You".to_string(), "Partner".to_string()],
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    }
}

fn create_test_app(
    extractor: Arc<dyn ReceiptExtractor>,
    writer: Arc<dyn RecordWriter>,
) -> axum::Router {
    let controller = SessionController::new(extractor, writer);
    let state = AppState::new(Arc::new(test_config()), Arc::new(controller));
    fridge_ri::build_router(state)
}

fn default_app() -> (axum::Router, Arc<StubWriter>) {
    let writer = StubWriter::new();
    let app = create_test_app(StubExtractor::sampled(), writer.clone());
    (app, writer)
}

/// Build a multipart form body with optional submitter and receipt parts
fn multipart_body(submitter: Option<&str>, receipt: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(name) = submitter {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"submitter\"\r\n\r\n{}\r\n",
                BOUNDARY, name
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = receipt {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"receipt\"; filename=\"receipt.pdf\"\r\nContent-Type: application/pdf\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(submitter: Option<&str>, receipt: Option<&[u8]>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/sessions")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(submitter, receipt)))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Upload the standard receipt and return the created session view
async fn create_session(app: &axum::Router) -> serde_json::Value {
    let response = app
        .clone()
        .oneshot(upload_request(Some("You"), Some(b"%PDF-1.4 receipt")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = response_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "fridge-ri");
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_root_page_serves_review_ui() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Fridge Receipt Import"));
    assert!(html.contains("/static/review.js"));
}

#[tokio::test]
async fn test_review_js_served() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/static/review.js")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/javascript"
    );
}

#[tokio::test]
async fn test_config_endpoint() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["submitters"], json!(["You", "Partner"]));
    assert_eq!(json["extraction_model"], "test-model");
}

#[tokio::test]
async fn test_upload_creates_review_session() {
    let (app, _writer) = default_app();

    let session = create_session(&app).await;

    assert!(session["session_id"].is_string());
    assert_eq!(session["phase"], "REVIEW");
    assert_eq!(session["submitter"], "You");
    assert_eq!(session["included_count"], 2);

    let items = session["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["food"], "Chicken Thighs");
    assert_eq!(items[0]["expiry_date"], "2025-03-17");
    assert_eq!(items[0]["cost"], 8.22);
    assert_eq!(items[0]["include"], true);
}

#[tokio::test]
async fn test_upload_unknown_submitter_rejected() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(upload_request(Some("Stranger"), Some(b"%PDF-1.4")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Stranger"));
}

#[tokio::test]
async fn test_upload_missing_fields_rejected() {
    let (app, _writer) = default_app();

    let response = app
        .clone()
        .oneshot(upload_request(None, Some(b"%PDF-1.4")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(upload_request(Some("You"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_non_pdf_rejected() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(upload_request(Some("You"), Some(b"GIF89a not a receipt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert!(json["error"]["message"].as_str().unwrap().contains("PDF"));
}

#[tokio::test]
async fn test_upload_extraction_failure_reports_and_discards() {
    let extractor = StubExtractor::scripted(vec![Err(ExtractionError::ParseError(
        "response is not the expected item array".to_string(),
    ))]);
    let app = create_test_app(extractor, StubWriter::new());

    let response = app
        .clone()
        .oneshot(upload_request(Some("You"), Some(b"%PDF-1.4")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = response_json(response).await;
    assert_eq!(json["error"]["code"], "EXTRACTION_FAILED");

    // Failure is surfaced through health diagnostics
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = response_json(response).await;
    assert!(json["last_error"].as_str().unwrap().contains("Parse error"));
}

#[tokio::test]
async fn test_get_session_not_found() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/sessions/00000000-0000-0000-0000-000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = response_json(response).await;
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_edit_item_roundtrip() {
    let (app, _writer) = default_app();
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/sessions/{}/items/0", session_id))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"cost": 7.50, "include": false}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["items"][0]["cost"], 7.5);
    assert_eq!(json["items"][0]["include"], false);
    assert_eq!(json["included_count"], 1);

    // Edits persist across a fresh GET
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = response_json(response).await;
    assert_eq!(json["items"][0]["cost"], 7.5);
    assert_eq!(json["included_count"], 1);
}

#[tokio::test]
async fn test_edit_item_rejects_negative_cost() {
    let (app, _writer) = default_app();
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/sessions/{}/items/0", session_id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"cost": -2.0}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_item_unknown_index() {
    let (app, _writer) = default_app();
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/sessions/{}/items/9", session_id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"include": false}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_item_rejects_unknown_field() {
    let (app, _writer) = default_app();
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/sessions/{}/items/0", session_id))
                .header("content-type", "application/json")
                .body(Body::from(json!({"price": 3.0}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_submit_full_success_clears_session() {
    let (app, writer) = default_app();
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sessions/{}/submit", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["submitted"], 2);
    assert_eq!(json["succeeded"], 2);
    assert_eq!(json["failed"], 0);
    assert_eq!(json["session_cleared"], true);
    assert_eq!(writer.calls(), vec!["Chicken Thighs", "Whole Milk"]);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_submit_partial_failure_keeps_session_for_retry() {
    let writer = StubWriter::failing(&["Whole Milk"]);
    let app = create_test_app(StubExtractor::sampled(), writer.clone());
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sessions/{}/submit", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["session_cleared"], false);
    assert_eq!(json["failures"][0]["food"], "Whole Milk");
    assert!(json["failures"][0]["reason"]
        .as_str()
        .unwrap()
        .contains("validation_error"));

    // Session survives with the succeeded item deselected
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["phase"], "REVIEW");
    assert_eq!(json["items"][0]["include"], false);
    assert_eq!(json["items"][1]["include"], true);
    assert_eq!(json["last_submission"]["failed"], 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = response_json(response).await;
    assert!(json["last_error"]
        .as_str()
        .unwrap()
        .contains("1 of 2 record store writes failed"));
}

#[tokio::test]
async fn test_submit_nothing_included_is_noop() {
    let (app, writer) = default_app();
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    for index in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/api/sessions/{}/items/{}", session_id, index))
                    .header("content-type", "application/json")
                    .body(Body::from(json!({"include": false}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sessions/{}/submit", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["submitted"], 0);
    assert_eq!(json["session_cleared"], false);
    assert!(writer.calls().is_empty());

    // Session is still there for further review
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reparse_replaces_items() {
    let extractor = StubExtractor::scripted(vec![
        Ok(vec![ExtractedItem {
            food: "Eggs".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 4, 19).unwrap(),
            cost: 5.99,
            notes: String::new(),
        }]),
        Ok(sample_items()),
    ]);
    let app = create_test_app(extractor, StubWriter::new());
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();
    assert_eq!(session["items"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/sessions/{}/parse", session_id))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(None, Some(b"%PDF-1.4 receipt"))))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert_eq!(json["included_count"], 2);
}

#[tokio::test]
async fn test_reparse_unknown_session() {
    let (app, _writer) = default_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sessions/00000000-0000-0000-0000-000000000000/parse")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(None, Some(b"%PDF-1.4 receipt"))))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_discard_session() {
    let (app, _writer) = default_app();
    let session = create_session(&app).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["status"], "discarded");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/sessions/{}", session_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
