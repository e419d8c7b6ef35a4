//! HTTP server.
//!
//! Thin JSON wrapper over [`Verifier`]. The server only starts listening
//! after the index has been built, so every request sees the final,
//! read-only index.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Static readiness marker |
//! | `GET`  | `/health` | Health check (returns version and index size) |
//! | `POST` | `/verify` | Grade an answer: `{question, answer, subject}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "kind": "blocked", "message": "The AI's response was blocked ..." } }
//! ```
//!
//! | Kind | Status |
//! |------|--------|
//! | `bad_request` | 400 |
//! | `blocked` | 422 |
//! | `transport_failure` | 502 |
//! | `parse_failure` | 502 (body includes `raw_text`) |
//! | `embedding_failure` | 503 |
//! | `internal_error` | 500 |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front-ends
//! can call the API directly.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::VerifyError;
use crate::models::{ErrorKind, RubricResult};
use crate::verifier::Verifier;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<Verifier>,
}

/// Build the router. Exposed separately from [`run_server`] for tests.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/verify", post(handle_verify))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on `[server].bind` until Ctrl-C.
pub async fn run_server(config: &Config, verifier: Arc<Verifier>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(AppState { verifier });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "verifier listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_text: Option<String>,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    detail: ErrorDetail,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.detail })).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        detail: ErrorDetail {
            kind: "bad_request".to_string(),
            message: message.into(),
            raw_text: None,
        },
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Blocked => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::TransportFailure | ErrorKind::ParseFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::EmbeddingFailure => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        let result = err.to_error_result();
        AppError {
            status: status_for(result.kind),
            detail: ErrorDetail {
                kind: result.kind.as_str().to_string(),
                message: result.message,
                raw_text: result.raw_text,
            },
        }
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn handle_root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "AI Verifier API is running.",
    })
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
    /// Documents in the index.
    documents: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: state.verifier.index().len(),
    })
}

// ============ POST /verify ============

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub question: String,
    pub answer: String,
    /// Accepted for API compatibility; grading does not use it.
    #[serde(default)]
    pub subject: Option<String>,
}

/// Handler for `POST /verify`.
///
/// The pipeline runs on its own task so that a panic inside it is reported
/// as `internal_error` instead of tearing down the connection.
async fn handle_verify(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<RubricResult>, AppError> {
    let Json(request) = payload.map_err(|e| bad_request(e.body_text()))?;

    if request.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    if request.answer.trim().is_empty() {
        return Err(bad_request("answer must not be empty"));
    }

    let verifier = Arc::clone(&state.verifier);
    let result = tokio::spawn(async move {
        verifier
            .verify(&request.question, &request.answer)
            .await
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "verify task failed");
        VerifyError::Internal(format!("verify task failed: {}", e))
    })??;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Blocked), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::TransportFailure), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::EmbeddingFailure), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_for(ErrorKind::InternalError), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parse_failure_body_keeps_raw_text() {
        let err = VerifyError::Parse {
            source: crate::error::ParseError::ScoreOutOfRange("500".to_string()),
            raw_text: "Overall Score: 500".to_string(),
        };
        let app_err = AppError::from(err);
        assert_eq!(app_err.status, StatusCode::BAD_GATEWAY);
        assert_eq!(app_err.detail.kind, "parse_failure");
        assert_eq!(app_err.detail.raw_text.as_deref(), Some("Overall Score: 500"));
    }
}
