//! Integration tests for the monitor API endpoints

use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use monitor_lib::{
    alert::{AlertManager, InMemoryAlertStore, LogDispatcher},
    health::{components, HealthRegistry, HealthState},
    AlertFilters, Algorithm, Anomaly, AnomalyType, MonitorError, MonitorMetrics, Severity,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Clone)]
struct AppState {
    health: HealthRegistry,
    alerts: Arc<AlertManager>,
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.health.snapshot().await;
    let status_code = match snapshot.state {
        HealthState::Ok | HealthState::Degraded => StatusCode::OK,
        HealthState::Failed => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(snapshot))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn list_active(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.alerts.active(&AlertFilters::default()).await {
        Ok(alerts) => (StatusCode::OK, Json(serde_json::json!(alerts))),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        ),
    }
}

#[derive(Deserialize)]
struct AcknowledgeRequest {
    by: String,
}

async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AcknowledgeRequest>,
) -> impl IntoResponse {
    match state.alerts.acknowledge(&id, &request.by).await {
        Ok(alert) => (StatusCode::OK, Json(serde_json::json!(alert))),
        Err(MonitorError::AlertNotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not found" })),
        ),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": err.to_string() })),
        ),
    }
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/alerts", get(list_active))
        .route("/api/v1/alerts/:id/acknowledge", post(acknowledge))
        .with_state(state)
}

fn sample_anomaly() -> Anomaly {
    Anomaly {
        id: uuid_like(),
        metric: "revenue".to_string(),
        anomaly_type: AnomalyType::Spike,
        severity: Severity::High,
        observed: 500.0,
        expected: 100.0,
        deviation_percent: 400.0,
        detected_at: chrono::Utc::now(),
        description: "spike on revenue".to_string(),
        algorithm: Some(Algorithm::ZScore),
        score: 6.0,
        threshold: 2.25,
    }
}

fn uuid_like() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap();
    format!("test-{:x}{:x}", now.as_secs(), now.subsec_nanos())
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    // Touch the global metrics registry so /metrics has content.
    let _ = MonitorMetrics::new();

    let health = HealthRegistry::new();
    health.register(components::SCHEDULER).await;
    health.register(components::ALERT_STORE).await;

    let alerts = Arc::new(AlertManager::new(
        Arc::new(InMemoryAlertStore::new()),
        Arc::new(LogDispatcher),
    ));

    let state = Arc::new(AppState { health, alerts });
    let router = create_test_router(state.clone());
    (router, state)
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["state"], "ok");
    assert!(health["components"]["scheduler"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_when_failed() {
    let (app, state) = setup_test_app().await;

    state
        .health
        .set_failed(components::ALERT_STORE, "store offline")
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_tracks_ready_flag() {
    let (app, state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    state.health.set_ready(true).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();
    assert!(metrics_text.contains("anomaly_monitor_sweep_duration_seconds"));
    assert!(metrics_text.contains("anomaly_monitor_alerts_created_total"));
}

#[tokio::test]
async fn test_list_active_returns_persisted_alerts() {
    let (app, state) = setup_test_app().await;

    state
        .alerts
        .process(sample_anomaly(), &[])
        .await
        .unwrap()
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/alerts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let alerts: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(alerts[0]["anomaly"]["metric"], "revenue");
    assert_eq!(alerts[0]["acknowledged"], false);
}

#[tokio::test]
async fn test_acknowledge_unknown_alert_is_404() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/alerts/missing/acknowledge")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"by":"ops"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_acknowledge_sets_operator() {
    let (app, state) = setup_test_app().await;

    let alert = state
        .alerts
        .process(sample_anomaly(), &[])
        .await
        .unwrap()
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/alerts/{}/acknowledge", alert.id))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"by":"ops"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let acked: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(acked["acknowledged"], true);
    assert_eq!(acked["acknowledged_by"], "ops");
}
