//! Pulse Monitor - anomaly detection and alerting service
//!
//! Periodically sweeps the platform's business and operational metrics,
//! detects anomalies, manages the alert lifecycle, and serves the operator
//! query surface over HTTP.

use anyhow::Result;
use monitor_lib::{
    alert::{AlertManager, InMemoryAlertStore, LogDispatcher},
    config::{CachedConfigStore, ConfigStore, DetectionConfig, InMemoryConfigStore},
    health::{components, HealthRegistry},
    investigate::InvestigationService,
    scheduler::{Scheduler, SchedulerConfig},
    MonitorMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod source;

const MONITOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting pulse-monitor");

    // Load configuration
    let service_config = config::ServiceConfig::load()?;
    info!(
        api_port = service_config.api_port,
        sweep_interval_secs = service_config.sweep_interval_secs,
        metrics_api = %service_config.metrics_api_url,
        "Monitor configured"
    );

    // Initialize health registry
    let health = HealthRegistry::new();
    health.register(components::SCHEDULER).await;
    health.register(components::CONFIG_STORE).await;
    health.register(components::METRIC_SOURCE).await;
    health.register(components::ALERT_STORE).await;
    health.register(components::DISPATCHER).await;

    // Initialize metrics and structured logger
    let metrics = MonitorMetrics::new();
    let logger = StructuredLogger::new("pulse-monitor");
    logger.log_startup(MONITOR_VERSION);

    // Detection configs: seeded from file when given, managed via the API
    let config_store: Arc<dyn ConfigStore> = match &service_config.detection_config_file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let seeded: Vec<DetectionConfig> = serde_json::from_str(&raw)?;
            info!(count = seeded.len(), path = %path, "Loaded detection configs");
            Arc::new(InMemoryConfigStore::with_configs(seeded)?)
        }
        None => Arc::new(InMemoryConfigStore::new()),
    };
    let configs = Arc::new(CachedConfigStore::new(
        config_store,
        service_config.config_cache_ttl(),
    ));

    // Alert pipeline
    let alert_store = Arc::new(InMemoryAlertStore::with_ttl(service_config.alert_ttl()));
    let alerts = Arc::new(
        AlertManager::new(alert_store.clone(), Arc::new(LogDispatcher))
            .with_cooldown_window(service_config.cooldown_window())
            .with_dispatch_timeout(service_config.dispatch_timeout()),
    );

    let metric_source = Arc::new(source::HttpMetricSource::new(
        &service_config.metrics_api_url,
    )?);
    let investigations = Arc::new(InvestigationService::new(
        alert_store,
        metric_source.clone(),
    ));

    // Detection scheduler
    let scheduler = Arc::new(Scheduler::new(
        configs.clone(),
        metric_source,
        alerts.clone(),
        SchedulerConfig {
            interval: service_config.sweep_interval(),
            history_days: service_config.history_days,
        },
        health.clone(),
    ));
    let scheduler_handle = scheduler.clone().spawn();

    // Operator API
    let state = Arc::new(api::AppState {
        health: health.clone(),
        metrics,
        alerts,
        configs,
        scheduler,
        investigations,
    });
    let _api_handle = tokio::spawn(api::serve(service_config.api_port, state));

    // Mark ready once wiring is complete
    health.set_ready(true).await;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    scheduler_handle.stop();
    info!("Shutting down");

    Ok(())
}
