//! services/api/tests/generate_timetable_test.rs
//!
//! End-to-end tests for the /generate-timetable pipeline, driving the real
//! router against an in-process fake of the generative-language API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_lib::adapters::gemini::GeminiPlanAdapter;
use api_lib::config::Config;
use api_lib::web::{api_router, state::AppState};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use study_planner_core::domain::{PlanRequest, PlanResponse};
use study_planner_core::form::FeasibilityPolicy;
use study_planner_core::ports::{GenerationError, PlanGenerationService};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::Level;

//=========================================================================================
// Fake Upstream
//=========================================================================================

/// An in-process stand-in for the Gemini REST API, with call counters so
/// tests can assert which outbound calls were (not) made.
#[derive(Clone)]
struct FakeUpstream {
    list_calls: Arc<AtomicUsize>,
    generate_calls: Arc<AtomicUsize>,
    requested_models: Arc<Mutex<Vec<String>>>,
    models_body: Arc<Value>,
    list_status: StatusCode,
    generation_text: Arc<Option<String>>,
    response_delay: Duration,
}

impl FakeUpstream {
    fn new(models_body: Value, generation_text: Option<&str>) -> Self {
        Self {
            list_calls: Arc::new(AtomicUsize::new(0)),
            generate_calls: Arc::new(AtomicUsize::new(0)),
            requested_models: Arc::new(Mutex::new(Vec::new())),
            models_body: Arc::new(models_body),
            list_status: StatusCode::OK,
            generation_text: Arc::new(generation_text.map(String::from)),
            response_delay: Duration::ZERO,
        }
    }

    fn with_list_status(mut self, status: StatusCode) -> Self {
        self.list_status = status;
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }
}

async fn fake_list_models(State(fake): State<FakeUpstream>) -> impl IntoResponse {
    fake.list_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(fake.response_delay).await;
    (fake.list_status, Json((*fake.models_body).clone()))
}

async fn fake_generate(
    State(fake): State<FakeUpstream>,
    Path(action): Path<String>,
) -> Json<Value> {
    fake.generate_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(fake.response_delay).await;
    let model = action.trim_end_matches(":generateContent").to_string();
    fake.requested_models.lock().unwrap().push(model);
    match (*fake.generation_text).as_deref() {
        Some(text) => Json(json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })),
        None => Json(json!({"candidates": []})),
    }
}

async fn spawn_upstream(fake: FakeUpstream) -> SocketAddr {
    let router = Router::new()
        .route("/v1beta/models", get(fake_list_models))
        .route("/v1beta/models/{action}", post(fake_generate))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

//=========================================================================================
// App and Request Helpers
//=========================================================================================

fn test_config(addr: SocketAddr, api_key: Option<&str>, timeout: Duration, policy: FeasibilityPolicy) -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        log_level: Level::INFO,
        gemini_api_key: api_key.map(String::from),
        gemini_base_url: format!("http://{addr}/v1beta"),
        upstream_timeout: timeout,
        feasibility_policy: policy,
        cors_origin: "http://localhost:3000".to_string(),
    }
}

fn planner_app(addr: SocketAddr, api_key: Option<&str>, timeout: Duration, policy: FeasibilityPolicy) -> Router {
    let config = Arc::new(test_config(addr, api_key, timeout, policy));
    let planner = Arc::new(GeminiPlanAdapter::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
        config.upstream_timeout,
        CancellationToken::new(),
    ));
    api_router(Arc::new(AppState { planner, config })).unwrap()
}

fn default_app(addr: SocketAddr) -> Router {
    planner_app(addr, Some("test-key"), Duration::from_secs(5), FeasibilityPolicy::Warn)
}

async fn post_timetable(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/generate-timetable")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

//=========================================================================================
// Fixtures
//=========================================================================================

fn capable_models() -> Value {
    json!({"models": [
        {"name": "models/gemini-pro", "supportedGenerationMethods": ["generateContent"]},
        {"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent"]},
        {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]}
    ]})
}

fn seven_day_plan() -> String {
    let days = [
        "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
    ];
    let schedule: Vec<Value> = days
        .iter()
        .map(|day| {
            json!({
                "day": day,
                "total_hours": 2,
                "sessions": [{
                    "time_slot": "09:00 - 10:00",
                    "subject": "Math",
                    "focus_topic": "Algebra",
                    "duration_mins": 60
                }]
            })
        })
        .collect();
    json!({
        "strategy_summary": "Hard subjects go first thing in the morning.",
        "schedule": schedule
    })
    .to_string()
}

fn valid_request() -> Value {
    json!({"totalHours": 14, "subjects": [
        {"id": "s1", "name": "Math", "preference": "hate", "importance": "critical", "minHours": 4},
        {"id": "s2", "name": "History", "preference": "like", "importance": "low", "minHours": 2}
    ]})
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn generates_a_timetable_end_to_end() {
    // The generator wraps its reply in a fence; the pipeline must not care.
    let fenced = format!("```json\n{}\n```", seven_day_plan());
    let fake = FakeUpstream::new(capable_models(), Some(&fenced));
    let addr = spawn_upstream(fake.clone()).await;

    let (status, body) = post_timetable(default_app(addr), valid_request()).await;

    assert_eq!(status, StatusCode::OK);
    let plan: PlanResponse = serde_json::from_value(body).unwrap();
    assert_eq!(plan.schedule.len(), 7);
    assert_eq!(plan.strategy_summary, "Hard subjects go first thing in the morning.");
    assert_eq!(fake.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fake.generate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn targets_the_flash_model_when_available() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;

    let (status, _) = post_timetable(default_app(addr), valid_request()).await;

    assert_eq!(status, StatusCode::OK);
    let requested = fake.requested_models.lock().unwrap().clone();
    assert_eq!(requested, vec!["gemini-1.5-flash".to_string()]);
}

#[tokio::test]
async fn falls_back_to_pro_without_a_flash_model() {
    let models = json!({"models": [
        {"name": "models/other", "supportedGenerationMethods": ["generateContent"]},
        {"name": "models/gemini-pro", "supportedGenerationMethods": ["generateContent"]}
    ]});
    let fake = FakeUpstream::new(models, Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;

    let (status, _) = post_timetable(default_app(addr), valid_request()).await;

    assert_eq!(status, StatusCode::OK);
    let requested = fake.requested_models.lock().unwrap().clone();
    assert_eq!(requested, vec!["gemini-pro".to_string()]);
}

#[tokio::test]
async fn missing_credential_short_circuits() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;
    let app = planner_app(addr, None, Duration::from_secs(5), FeasibilityPolicy::Warn);

    let (status, body) = post_timetable(app, valid_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "GEMINI_API_KEY is not defined");
    // No outbound call of any kind is attempted without the credential.
    assert_eq!(fake.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fake.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unparseable_generation_is_a_flat_500() {
    let fake = FakeUpstream::new(capable_models(), Some("not json at all"));
    let addr = spawn_upstream(fake.clone()).await;

    let (status, body) = post_timetable(default_app(addr), valid_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(!error.is_empty());
    // Never a partially-populated schedule.
    assert!(body.get("schedule").is_none());
}

#[tokio::test]
async fn empty_generation_is_a_flat_500() {
    let fake = FakeUpstream::new(capable_models(), None);
    let addr = spawn_upstream(fake.clone()).await;

    let (status, body) = post_timetable(default_app(addr), valid_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate timetable");
}

#[tokio::test]
async fn no_capable_model_fails_before_generation() {
    let models = json!({"models": [
        {"name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"]}
    ]});
    let fake = FakeUpstream::new(models, Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;

    let (status, body) = post_timetable(default_app(addr), valid_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate timetable");
    assert_eq!(fake.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn listing_failure_fails_the_attempt() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()))
        .with_list_status(StatusCode::INTERNAL_SERVER_ERROR);
    let addr = spawn_upstream(fake.clone()).await;

    let (status, body) = post_timetable(default_app(addr), valid_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate timetable");
    assert_eq!(fake.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn gated_requests_make_no_outbound_calls() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;

    let no_hours = json!({"totalHours": 0, "subjects": valid_request()["subjects"]});
    let (status, body) = post_timetable(default_app(addr), no_hours).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "totalHours must be greater than zero");

    let no_subjects = json!({"totalHours": 14, "subjects": []});
    let (status, body) = post_timetable(default_app(addr), no_subjects).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "at least one subject is required");

    assert_eq!(fake.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(fake.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upstream_deadline_fails_the_attempt() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()))
        .with_delay(Duration::from_millis(500));
    let addr = spawn_upstream(fake.clone()).await;
    let app = planner_app(
        addr,
        Some("test-key"),
        Duration::from_millis(50),
        FeasibilityPolicy::Warn,
    );

    let (status, body) = post_timetable(app, valid_request()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to generate timetable");
}

#[tokio::test]
async fn infeasible_minimums_are_refused_under_reject_policy() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;
    let app = planner_app(addr, Some("test-key"), Duration::from_secs(5), FeasibilityPolicy::Reject);

    let infeasible = json!({"totalHours": 3, "subjects": [
        {"id": "s1", "name": "Math", "preference": "neutral", "importance": "medium", "minHours": 9}
    ]});
    let (status, body) = post_timetable(app, infeasible).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "declared minimum hours exceed the weekly budget by 6"
    );
    assert_eq!(fake.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn infeasible_minimums_pass_through_under_pass_policy() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;
    let app = planner_app(
        addr,
        Some("test-key"),
        Duration::from_secs(5),
        FeasibilityPolicy::PassThrough,
    );

    let infeasible = json!({"totalHours": 3, "subjects": [
        {"id": "s1", "name": "Math", "preference": "neutral", "importance": "medium", "minHours": 9}
    ]});
    let (status, _) = post_timetable(app, infeasible).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(fake.generate_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_cancels_an_attempt_before_it_calls_out() {
    let fake = FakeUpstream::new(capable_models(), Some(&seven_day_plan()));
    let addr = spawn_upstream(fake.clone()).await;

    let shutdown = CancellationToken::new();
    let adapter = GeminiPlanAdapter::new(
        Some("test-key".to_string()),
        format!("http://{addr}/v1beta"),
        Duration::from_secs(5),
        shutdown.clone(),
    );
    shutdown.cancel();

    let request: PlanRequest = serde_json::from_value(valid_request()).unwrap();
    let err = adapter.generate_plan(&request).await.unwrap_err();
    assert!(matches!(err, GenerationError::Cancelled));
}
