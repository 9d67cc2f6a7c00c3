//! Postplan HTTP front end
//!
//! Axum-based server for the browser form, the JSON API and the plan download.
//! Each endpoint has a thin axum handler that delegates to an inner function;
//! the inner functions are directly testable without axum dispatch.
//!
//! Endpoints:
//! - GET  /            : topic form
//! - POST /generate    : form submit, renders the plan page
//! - POST /download    : decoded plan as a `text/plain` attachment
//! - POST /api/generate: JSON plan
//! - GET  /health      : liveness and auto-save state
//! - GET  /version     : server version info

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use postplan_core::models::DEFAULT_IDEA_COUNT;
use postplan_core::{export_file_name, PlanError, PlanOutcome, PlanPipeline};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::render;

/// Shared state for all HTTP handlers. Built once at start-up.
#[derive(Clone)]
pub struct HttpState {
    pub pipeline: PlanPipeline,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/generate", post(generate_form_handler))
        .route("/download", post(download_handler))
        .route("/api/generate", post(api_generate_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .with_state(state)
}

/// Start the HTTP server on `addr`.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    addr: &str,
    pipeline: PlanPipeline,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let state = Arc::new(HttpState { pipeline });

    let app = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Postplan listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub topic: String,
    pub count: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub topic: Option<String>,
    pub count: Option<u8>,
}

/// `plan` is the base64 form of the raw reply written by the result page.
#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub plan: String,
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

fn error_status(err: &PlanError) -> StatusCode {
    match err {
        PlanError::Validation(_) => StatusCode::BAD_REQUEST,
        PlanError::Generation(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Short message shown to the user for a failed run.
pub fn user_message(err: &PlanError) -> String {
    match err {
        PlanError::Validation(e) => e.to_string(),
        PlanError::Generation(e) => format!("Could not generate ideas: {}", e),
    }
}

/// Form submit: returns (status, html).
pub async fn generate_page_inner(
    pipeline: &PlanPipeline,
    form: GenerateForm,
) -> (StatusCode, String) {
    let count = form.count.unwrap_or(DEFAULT_IDEA_COUNT);
    match pipeline.run(&form.topic, count).await {
        Ok(outcome) => (StatusCode::OK, render::result_page(&outcome)),
        Err(e) => (
            error_status(&e),
            render::error_page(&user_message(&e), &form.topic, count),
        ),
    }
}

/// JSON body for a successful run.
pub fn outcome_json(outcome: &PlanOutcome, took_ms: u64) -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "request_id": outcome.request_id,
        "topic": outcome.request.topic(),
        "count": outcome.request.count(),
        "ideas": outcome.ideas,
        "raw": outcome.raw,
        "persistence": {
            "state": outcome.persistence,
            "notice": outcome.persistence.notice(),
        },
        "download": {
            "file_name": outcome.export.file_name,
            "mime": outcome.export.mime,
        },
        "took_ms": took_ms,
    })
}

/// JSON generate: returns (status, json).
pub async fn api_generate_inner(
    pipeline: &PlanPipeline,
    req: GenerateRequest,
) -> (StatusCode, serde_json::Value) {
    let topic = req.topic.unwrap_or_default();
    let count = req.count.unwrap_or(DEFAULT_IDEA_COUNT);

    let start = Instant::now();
    let result = pipeline.run(&topic, count).await;
    let took_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(outcome) => (StatusCode::OK, outcome_json(&outcome, took_ms)),
        Err(e) => (
            error_status(&e),
            serde_json::json!({
                "error": user_message(&e),
                "status": "error",
            }),
        ),
    }
}

/// `Content-Disposition` for the export. ASCII fallback plus RFC 5987 name.
pub fn content_disposition(topic: &str) -> String {
    let file_name = export_file_name(topic.trim());
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(&file_name, NON_ALPHANUMERIC);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

/// Download: returns (status, content-disposition, body).
pub fn download_inner(form: DownloadForm) -> (StatusCode, Option<String>, String) {
    if form.topic.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            None,
            "topic field is required".to_string(),
        );
    }
    match render::decode_plan(&form.plan) {
        Some(raw) => (StatusCode::OK, Some(content_disposition(&form.topic)), raw),
        None => (
            StatusCode::BAD_REQUEST,
            None,
            "plan field is not a valid encoded plan".to_string(),
        ),
    }
}

pub fn health_inner(pipeline: &PlanPipeline) -> serde_json::Value {
    serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "generator": pipeline.generator_name(),
        "sink_enabled": pipeline.sink_enabled(),
    })
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "postplan/1",
    })
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn index_handler() -> Html<String> {
    Html(render::index_page())
}

pub async fn generate_form_handler(
    State(state): State<Arc<HttpState>>,
    Form(form): Form<GenerateForm>,
) -> impl IntoResponse {
    let (status, body) = generate_page_inner(&state.pipeline, form).await;
    (status, Html(body))
}

pub async fn api_generate_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<GenerateRequest>,
) -> impl IntoResponse {
    let (status, body) = api_generate_inner(&state.pipeline, req).await;
    (status, Json(body))
}

pub async fn download_handler(Form(form): Form<DownloadForm>) -> Response {
    let (status, disposition, body) = download_inner(form);
    let mut response = (status, body).into_response();

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Some(disposition) = disposition {
        match HeaderValue::from_str(&disposition) {
            Ok(v) => {
                headers.insert(header::CONTENT_DISPOSITION, v);
            }
            Err(e) => tracing::warn!(error = %e, "Invalid Content-Disposition header"),
        }
    }
    response
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(health_inner(&state.pipeline)))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
