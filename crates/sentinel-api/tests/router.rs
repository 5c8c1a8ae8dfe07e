//! Router tests for the sentinel HTTP surface

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use sentinel_api::{create_router, AppState};
use sentinel_core::engine::EngineBuilder;
use sentinel_core::probes::{Probe, ProbeSet};
use sentinel_core::testing::{MemoryAuditSink, RecordingSleeper, RecordingTrigger, ScriptedProbe};
use sentinel_core::{CheckType, ProbeResult, SentinelConfig};
use std::sync::Arc;
use tower::ServiceExt;

fn config() -> SentinelConfig {
    serde_json::from_value(serde_json::json!({
        "site_url": "https://compliance.example.com",
        "database": { "url": "https://project.example.co", "table": "regulations" }
    }))
    .unwrap()
}

/// One page that always passes and one function that fails then passes
fn state() -> (Arc<AppState>, Arc<RecordingTrigger>) {
    let probes = ProbeSet::new(vec![
        Arc::new(ScriptedProbe::passing("home", CheckType::Page)) as Arc<dyn Probe>,
        Arc::new(ScriptedProbe::new(
            "fetch-bills",
            CheckType::Function,
            vec![ProbeResult::warn(10, "Preflight returned status 503"), ProbeResult::pass(8)],
        )),
    ]);
    let trigger = Arc::new(RecordingTrigger::accepting());
    let engine = EngineBuilder::new(config())
        .with_probes(probes)
        .with_trigger_client(trigger.clone())
        .with_sleeper(Arc::new(RecordingSleeper::default()))
        .with_audit_sink(Arc::new(MemoryAuditSink::default()))
        .build()
        .unwrap();
    (Arc::new(AppState::new(engine)), trigger)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_service_health() {
    let (state, _) = state();
    let response = create_router(state)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["probes"], 2);
}

#[tokio::test]
async fn test_post_run_heals_by_default() {
    let (state, _) = state();
    let response = create_router(state)
        .oneshot(Request::post("/api/v1/health/run").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-sentinel-run-id"));

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["score"], 100);
    assert_eq!(json["healed"], 1);
    assert_eq!(json["selfHealingEnabled"], true);
    assert_eq!(json["checks"][1]["details"]["healed"], true);
    assert_eq!(json["remediations"][0]["action"], "retry_edge_function:fetch-bills");
    assert!(json["runId"].is_string());
}

#[tokio::test]
async fn test_post_run_with_healing_disabled() {
    let (state, trigger) = state();
    let request = Request::post("/api/v1/health/run")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"selfHealing":false}"#))
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "warning");
    assert_eq!(json["score"], 50);
    assert_eq!(json["selfHealingEnabled"], false);
    assert_eq!(json["remediations"], serde_json::json!([]));
    assert_eq!(trigger.call_count(), 0);
}

#[tokio::test]
async fn test_post_opt_out_without_content_type() {
    let (state, trigger) = state();
    let request = Request::post("/api/v1/health/run")
        .body(Body::from(r#"{"selfHealing":false}"#))
        .unwrap();
    let response = create_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["selfHealingEnabled"], false);
    assert_eq!(json["remediations"], serde_json::json!([]));
    assert_eq!(trigger.call_count(), 0);
}

#[tokio::test]
async fn test_post_malformed_body_is_rejected() {
    let (state, trigger) = state();
    let router = create_router(state);

    for body in [r#"{"selfHealing":"no"}"#, "selfHealing=false", r#"{"selfhealing":false}"#] {
        let request = Request::post("/api/v1/health/run")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().starts_with("invalid run request"));
    }
    assert_eq!(trigger.call_count(), 0);
}

#[tokio::test]
async fn test_get_run_reads_query() {
    let (state, _) = state();
    let response = create_router(state)
        .oneshot(
            Request::get("/api/v1/health/run?selfHealing=false")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = body_json(response).await;
    assert_eq!(json["selfHealingEnabled"], false);
    assert_eq!(json["totalChecks"], 2);
    assert_eq!(json["warnings"], 1);
}

#[tokio::test]
async fn test_metrics_after_run() {
    let (state, _) = state();
    let router = create_router(state);

    router
        .clone()
        .oneshot(Request::post("/api/v1/health/run").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let response = router
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("sentinel_runs_total{status=\"healthy\"} 1"));
    assert!(text.contains(
        "sentinel_remediations_total{issue=\"function_unhealthy\",status=\"success\"} 1"
    ));
}
