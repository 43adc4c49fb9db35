//! HTTP API: operator query surface plus health and Prometheus metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use monitor_lib::{
    alert::AlertManager,
    config::{CachedConfigStore, DetectionConfig},
    health::{HealthRegistry, HealthState},
    investigate::InvestigationService,
    scheduler::Scheduler,
    AlertFilters, AnomalyType, MonitorError, MonitorMetrics, Severity, TimeRange,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health: HealthRegistry,
    pub metrics: MonitorMetrics,
    pub alerts: Arc<AlertManager>,
    pub configs: Arc<CachedConfigStore>,
    pub scheduler: Arc<Scheduler>,
    pub investigations: Arc<InvestigationService>,
}

/// Library errors mapped onto HTTP statuses
struct ApiError(MonitorError);

impl From<MonitorError> for ApiError {
    fn from(err: MonitorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MonitorError::AlertNotFound(_) => StatusCode::NOT_FOUND,
            MonitorError::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct AlertQuery {
    metric: Option<String>,
    severity: Option<Severity>,
    #[serde(rename = "type")]
    anomaly_type: Option<AnomalyType>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
}

impl AlertQuery {
    fn filters(self) -> AlertFilters {
        AlertFilters {
            metric: self.metric,
            severity: self.severity,
            anomaly_type: self.anomaly_type,
            since: self.since,
            until: self.until,
        }
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    metric: Option<String>,
    severity: Option<Severity>,
    #[serde(rename = "type")]
    anomaly_type: Option<AnomalyType>,
}

impl HistoryQuery {
    /// Defaults to the last 24 hours, matching alert retention.
    fn range(&self) -> TimeRange {
        let end = self.end.unwrap_or_else(Utc::now);
        let start = self.start.unwrap_or(end - chrono::Duration::hours(24));
        TimeRange::new(start, end)
    }

    fn filters(&self) -> AlertFilters {
        AlertFilters {
            metric: self.metric.clone(),
            severity: self.severity,
            anomaly_type: self.anomaly_type,
            since: None,
            until: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AcknowledgeRequest {
    by: String,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    #[serde(default)]
    notes: Option<String>,
}

/// Health check - 200 while serving, 503 once a component has failed
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.health.snapshot().await;

    let status_code = match snapshot.state {
        HealthState::Ok | HealthState::Degraded => StatusCode::OK,
        HealthState::Failed => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(snapshot))
}

/// Readiness check - 200 once startup wiring completed
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
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

/// Last sweep summary for dashboards and health consumers
async fn sweep_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let last_sweep = state.scheduler.last_sweep().await;
    Json(serde_json::json!({ "last_sweep": last_sweep }))
}

async fn list_active(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AlertQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = state.alerts.active(&query.filters()).await?;
    Ok(Json(alerts))
}

async fn list_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = state
        .alerts
        .history(query.range(), &query.filters())
        .await?;
    Ok(Json(alerts))
}

async fn statistics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = state.alerts.statistics(query.range()).await?;
    Ok(Json(stats))
}

async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AcknowledgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state.alerts.acknowledge(&id, &request.by).await?;
    Ok(Json(alert))
}

async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let alert = state.alerts.resolve(&id, request.notes).await?;
    Ok(Json(alert))
}

async fn investigation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let investigation = state.investigations.investigate(&id).await?;
    Ok(Json(investigation))
}

async fn list_configs(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let configs = state.configs.get_all().await?;
    Ok(Json(configs))
}

async fn upsert_config(
    State(state): State<Arc<AppState>>,
    Path(metric): Path<String>,
    Json(config): Json<DetectionConfig>,
) -> Result<impl IntoResponse, ApiError> {
    if config.metric != metric {
        return Err(MonitorError::InvalidConfig {
            metric,
            reason: format!("body metric '{}' does not match path", config.metric),
        }
        .into());
    }
    state.configs.upsert(config.clone()).await?;
    Ok(Json(config))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/status", get(sweep_status))
        .route("/api/v1/alerts", get(list_active))
        .route("/api/v1/alerts/history", get(list_history))
        .route("/api/v1/alerts/statistics", get(statistics))
        .route("/api/v1/alerts/:id/acknowledge", post(acknowledge))
        .route("/api/v1/alerts/:id/resolve", post(resolve))
        .route("/api/v1/alerts/:id/investigation", get(investigation))
        .route("/api/v1/configs", get(list_configs))
        .route("/api/v1/configs/:metric", put(upsert_config))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
