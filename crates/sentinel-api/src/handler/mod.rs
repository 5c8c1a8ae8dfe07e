//! HTTP handler for the sentinel
//!
//! The run endpoint answers 200 with a full report for every well-formed
//! request; a degraded platform is data, not an HTTP error.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sentinel_core::triggers::RUN_ID_HEADER;
use sentinel_core::{HealthReport, RunOptions, SentinelEngine};

/// Application state
pub struct AppState {
    pub engine: SentinelEngine,
}

impl AppState {
    pub fn new(engine: SentinelEngine) -> Self {
        Self { engine }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(service_health))
        .route("/metrics", get(metrics))
        .route("/api/v1/health/run", get(run_from_query).post(run_from_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Optional body of `POST /api/v1/health/run`
///
/// An empty body heals. A non-empty body is parsed as JSON whatever its
/// content type, and a malformed one is rejected with 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RunRequest {
    #[serde(default)]
    pub self_healing: Option<bool>,
}

/// Query string of `GET /api/v1/health/run`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQuery {
    pub self_healing: Option<bool>,
}

/// Liveness of the sentinel service itself
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub probes: usize,
}

async fn service_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ServiceHealth {
        status: "healthy",
        service: "platform-sentinel",
        version: env!("CARGO_PKG_VERSION"),
        probes: state.engine.probe_count(),
    })
}

/// Error body for a rejected run request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

async fn run_from_body(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RunRequest::default()
    } else {
        match serde_json::from_slice::<RunRequest>(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected run request body");
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("invalid run request: {}", e),
                    }),
                )
                    .into_response();
            }
        }
    };
    run(&state, request.self_healing.unwrap_or(true)).await
}

async fn run_from_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunQuery>,
) -> Response {
    run(&state, query.self_healing.unwrap_or(true)).await
}

async fn run(state: &AppState, self_healing: bool) -> Response {
    let report: HealthReport = state.engine.run(RunOptions { self_healing }).await;
    let run_id = HeaderValue::from_str(&report.run_id.to_string())
        .unwrap_or_else(|_| HeaderValue::from_static(""));
    (StatusCode::OK, [(RUN_ID_HEADER, run_id)], Json(report)).into_response()
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.engine.metrics().encode_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                e.to_string(),
            )
        }
    }
}
