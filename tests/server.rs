//! HTTP contract tests, driving the router in-process with `oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use exam_verifier::embedding::{DisabledProvider, EmbeddingProvider};
use exam_verifier::error::EmbeddingError;
use exam_verifier::grading::{GradeOutcome, GradingClient};
use exam_verifier::index::{InMemoryIndex, VectorIndex};
use exam_verifier::models::{Document, IndexEntry};
use exam_verifier::server::{router, AppState};
use exam_verifier::verifier::Verifier;

struct UnitEmbedder;

#[async_trait]
impl EmbeddingProvider for UnitEmbedder {
    fn model_name(&self) -> &str {
        "unit"
    }
    fn dims(&self) -> usize {
        2
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

struct CannedGrader(GradeOutcome);

#[async_trait]
impl GradingClient for CannedGrader {
    fn model_name(&self) -> &str {
        "canned"
    }
    async fn grade(&self, _prompt: &str) -> GradeOutcome {
        self.0.clone()
    }
}

async fn app_with(
    embedder: Arc<dyn EmbeddingProvider>,
    outcome: GradeOutcome,
) -> axum::Router {
    let index = InMemoryIndex::new();
    index
        .add(vec![IndexEntry::new(
            Document {
                id: "doc_0".to_string(),
                source: "calculus.txt".to_string(),
                text: "Calculus is the study of change.".to_string(),
            },
            vec![1.0, 0.0],
        )])
        .await
        .unwrap();

    let verifier = Verifier::new(embedder, Arc::new(index), Arc::new(CannedGrader(outcome)));
    router(AppState {
        verifier: Arc::new(verifier),
    })
}

async fn app(outcome: GradeOutcome) -> axum::Router {
    app_with(Arc::new(UnitEmbedder), outcome).await
}

fn verify_request(body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/verify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_root_reports_running() {
    let app = app(GradeOutcome::Blocked).await;
    let (status, body) = send(
        app,
        Request::builder().uri("/").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "AI Verifier API is running.");
}

#[tokio::test]
async fn test_health_reports_index_size() {
    let app = app(GradeOutcome::Blocked).await;
    let (status, body) = send(
        app,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["documents"], 1);
}

#[tokio::test]
async fn test_verify_returns_rubric() {
    let reply = "Overall Score: 85\nAccuracy: Good\nStrengths: Clear.\nSuggestions: Add examples.";
    let app = app(GradeOutcome::Success(reply.to_string())).await;

    let (status, body) = send(
        app,
        verify_request(json!({
            "question": "What is calculus?",
            "answer": "It's about derivatives.",
            "subject": "math"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overall_score"], 85);
    assert_eq!(body["accuracy"]["rating"], "Good");
    assert_eq!(body["accuracy"]["feedback"], "N/A");
    assert_eq!(body["ai_feedback"]["strengths"], "Clear.");
    assert_eq!(body["ai_feedback"]["suggestions"], "Add examples.");
    assert_eq!(body["retrieved_sources"][0]["id"], "doc_0");
    assert_eq!(body["retrieved_sources"][0]["source"], "calculus.txt");
}

#[tokio::test]
async fn test_blocked_maps_to_422() {
    let app = app(GradeOutcome::Blocked).await;
    let (status, body) = send(
        app,
        verify_request(json!({ "question": "q", "answer": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["kind"], "blocked");
    assert!(body["error"].get("raw_text").is_none());
}

#[tokio::test]
async fn test_transport_failure_maps_to_502() {
    let app = app(GradeOutcome::TransportFailure("HTTP 401".to_string())).await;
    let (status, body) = send(
        app,
        verify_request(json!({ "question": "q", "answer": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "transport_failure");
}

#[tokio::test]
async fn test_out_of_range_score_includes_raw_text() {
    let app = app(GradeOutcome::Success("Overall Score: 250".to_string())).await;
    let (status, body) = send(
        app,
        verify_request(json!({ "question": "q", "answer": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["kind"], "parse_failure");
    assert_eq!(body["error"]["raw_text"], "Overall Score: 250");
}

#[tokio::test]
async fn test_embedding_failure_maps_to_503() {
    let app = app_with(
        Arc::new(DisabledProvider),
        GradeOutcome::Success("Overall Score: 50".to_string()),
    )
    .await;
    let (status, body) = send(
        app,
        verify_request(json!({ "question": "q", "answer": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["kind"], "embedding_failure");
}

#[tokio::test]
async fn test_empty_answer_is_bad_request() {
    let app = app(GradeOutcome::Blocked).await;
    let (status, body) = send(
        app,
        verify_request(json!({ "question": "What is calculus?", "answer": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "bad_request");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app(GradeOutcome::Blocked).await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/verify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"question\": \"q\""))
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["kind"], "bad_request");
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = app(GradeOutcome::Blocked).await;
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/verify")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}
