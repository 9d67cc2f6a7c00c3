//! HTTP integration tests for the Postplan router
//!
//! Full handler dispatch through `oneshot`, with stub generators and sinks in
//! place of the Gemini and Sheets clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use postplan_core::{
    GenerationError, HistoryRow, IdeaGenerator, PlanPipeline, RecordSink, SinkError,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use postplan_server::http::{build_router, HttpState};
use tower::ServiceExt;

const REPLY: &str = "1. Idea: Latte art for beginners\n   Caption: Hearts first ☕\n   Best time: Saturday 9 AM\n   Hashtags: #coffee #latteart\n\n2. Idea: Cold brew at home\n   Caption: Summer mode 🧊\n   Best time: Friday 3 PM\n   Hashtags: #coldbrew";

struct StubGenerator {
    calls: AtomicUsize,
    fail: bool,
    reply: &'static str,
}

#[async_trait]
impl IdeaGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(GenerationError::Api {
                code: 503,
                message: "simulated outage".to_string(),
            })
        } else {
            Ok(self.reply.to_string())
        }
    }

    fn name(&self) -> &str {
        "stub"
    }
}

#[derive(Default)]
struct CountingSink {
    rows: std::sync::Mutex<Vec<HistoryRow>>,
}

#[async_trait]
impl RecordSink for CountingSink {
    async fn append(&self, row: &HistoryRow) -> Result<(), SinkError> {
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct Harness {
    generator: Arc<StubGenerator>,
    sink: Arc<CountingSink>,
    app: axum::Router,
}

fn harness(fail: bool, with_sink: bool) -> Harness {
    harness_with_reply(fail, with_sink, REPLY)
}

fn harness_with_reply(fail: bool, with_sink: bool, reply: &'static str) -> Harness {
    let generator = Arc::new(StubGenerator {
        calls: AtomicUsize::new(0),
        fail,
        reply,
    });
    let sink = Arc::new(CountingSink::default());
    let sink_cap: Option<Arc<dyn RecordSink>> = if with_sink {
        Some(sink.clone())
    } else {
        None
    };
    let pipeline = PlanPipeline::new(generator.clone(), sink_cap);
    let app = build_router(Arc::new(HttpState { pipeline }));
    Harness {
        generator,
        sink,
        app,
    }
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// ===========================================================================
// TEST 1: GET / serves the form
// ===========================================================================
#[tokio::test]
async fn test_index_serves_form() {
    let h = harness(false, false);
    let req = Request::builder().uri("/").body(Body::empty()).unwrap();

    let resp = h.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains(r#"<form method="post" action="/generate">"#));
    assert!(html.contains(r#"name="topic""#));
}

// ===========================================================================
// TEST 2: POST /generate renders ideas and saves once
// ===========================================================================
#[tokio::test]
async fn test_generate_form_renders_and_saves() {
    let h = harness(false, true);

    let resp = h
        .app
        .oneshot(form_post("/generate", "topic=coffee+drinks&count=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;

    assert!(html.contains("Here are your 2 post ideas!"));
    assert!(html.contains("Idea 1: Latte art for beginners"));
    assert!(html.contains("Idea 2: Cold brew at home"));
    assert!(html.contains("Saved to Google Sheets!"));
    assert!(html.contains(r#"name="topic" value="coffee drinks""#));

    let rows = h.sink.rows.lock().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].topic, "coffee drinks");
    assert!(!rows[0].flattened_text.contains('\n'));
}

// ===========================================================================
// TEST 3: empty topic: 400 and no generator call
// ===========================================================================
#[tokio::test]
async fn test_generate_form_empty_topic() {
    let h = harness(false, true);

    let resp = h
        .app
        .oneshot(form_post("/generate", "topic=&count=3"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(resp).await.contains("Please enter a topic!"));
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    assert!(h.sink.rows.lock().unwrap().is_empty());
}

// ===========================================================================
// TEST 4: outage: 502, no records, no sink write
// ===========================================================================
#[tokio::test]
async fn test_api_generate_outage() {
    let h = harness(true, true);

    let resp = h
        .app
        .oneshot(json_post(
            "/api/generate",
            serde_json::json!({ "topic": "fitness", "count": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["status"], "error");
    assert!(json["error"].as_str().unwrap().contains("simulated outage"));
    assert!(json.get("ideas").is_none());
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    assert!(h.sink.rows.lock().unwrap().is_empty());
}

// ===========================================================================
// TEST 5: sink unavailable: plan returned with disabled notice
// ===========================================================================
#[tokio::test]
async fn test_api_generate_without_sink() {
    let h = harness(false, false);

    let resp = h
        .app
        .oneshot(json_post(
            "/api/generate",
            serde_json::json!({ "topic": "coffee" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["count"], 3);
    assert_eq!(json["ideas"].as_array().unwrap().len(), 2);
    assert_eq!(json["ideas"][1]["hashtags"], "#coldbrew");
    assert_eq!(json["persistence"]["state"]["status"], "disabled");
    assert!(json["persistence"]["notice"]
        .as_str()
        .unwrap()
        .contains("Auto-save disabled"));
    assert_eq!(json["download"]["file_name"], "coffee_social_plan.txt");
    assert_eq!(json["raw"], REPLY);
}

// ===========================================================================
// TEST 6: the download form on the result page returns the exact reply
// ===========================================================================
#[tokio::test]
async fn test_download_round_trip_keeps_line_endings() {
    const CRLF_REPLY: &str = "Idea: a\r\nCaption: b\r\n\r\nIdea: c\rCaption: d\n";
    let h = harness_with_reply(false, false, CRLF_REPLY);

    let resp = h
        .app
        .clone()
        .oneshot(form_post("/generate", "topic=study+motivation&count=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;

    let plan = hidden_value(&html, "plan");
    let topic = hidden_value(&html, "topic");
    assert_eq!(topic, "study motivation");

    let body = format!(
        "topic={}&plan={}",
        utf8_percent_encode(&topic, NON_ALPHANUMERIC),
        utf8_percent_encode(&plan, NON_ALPHANUMERIC)
    );
    let resp = h.app.oneshot(form_post("/download", &body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let disposition = resp.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"study_motivation_social_plan.txt\""));
    assert_eq!(body_string(resp).await, CRLF_REPLY);
}

/// Value of `<input type="hidden" name="{name}" value="...">` in a page.
fn hidden_value(html: &str, name: &str) -> String {
    let marker = format!(r#"<input type="hidden" name="{}" value=""#, name);
    let start = html.find(&marker).expect("hidden input present") + marker.len();
    let end = html[start..].find('"').expect("closing quote") + start;
    html[start..end].to_string()
}

// ===========================================================================
// TEST 7: GET /health reflects sink availability
// ===========================================================================
#[tokio::test]
async fn test_health_endpoint() {
    let h = harness(false, true);
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = h.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["generator"], "stub");
    assert_eq!(json["sink_enabled"], true);
}

// ===========================================================================
// TEST 8: GET /version via oneshot
// ===========================================================================
#[tokio::test]
async fn test_version_endpoint() {
    let h = harness(false, false);
    let req = Request::builder()
        .uri("/version")
        .body(Body::empty())
        .unwrap();

    let resp = h.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert!(json["version"].is_string());
    assert_eq!(json["protocol"], "postplan/1");
}
