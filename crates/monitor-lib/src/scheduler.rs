//! Periodic detection sweeps
//!
//! One logical sweep per tick: load all enabled configs, fetch history per
//! metric, run detection, hand candidates to the alert manager. Metrics are
//! independent; a failure on one is logged and skips only that metric.

use crate::alert::AlertManager;
use crate::config::CachedConfigStore;
use crate::detect::{AnomalyDetector, MIN_HISTORY_POINTS};
use crate::error::Result;
use crate::health::{components, HealthRegistry};
use crate::models::{AlertFilters, TimeRange};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::source::MetricSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tracing::{info, warn};

/// Default tick interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default history window handed to the detector, in days.
pub const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub history_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

/// Outcome of one sweep, cached for health-check and status consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub metrics_processed: usize,
    pub metrics_skipped: usize,
    pub metrics_failed: usize,
    pub anomalies_found: usize,
}

/// Drives the detection pipeline on a fixed interval.
pub struct Scheduler {
    configs: Arc<CachedConfigStore>,
    source: Arc<dyn MetricSource>,
    alerts: Arc<AlertManager>,
    detector: AnomalyDetector,
    config: SchedulerConfig,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
    last_sweep: RwLock<Option<SweepSummary>>,
}

impl Scheduler {
    pub fn new(
        configs: Arc<CachedConfigStore>,
        source: Arc<dyn MetricSource>,
        alerts: Arc<AlertManager>,
        config: SchedulerConfig,
        health: HealthRegistry,
    ) -> Self {
        Self {
            configs,
            source,
            alerts,
            detector: AnomalyDetector::new(),
            config,
            health,
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new("scheduler"),
            last_sweep: RwLock::new(None),
        }
    }

    /// Spawn the tick loop and return a handle that can stop it.
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(self.run(shutdown_rx));
        SchedulerHandle { shutdown: shutdown_tx }
    }

    /// Run sweeps until the shutdown channel fires.
    ///
    /// Stopping prevents future ticks; a sweep already in flight finishes.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting detection scheduler"
        );

        let mut ticker = interval(self.config.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down detection scheduler");
                    break;
                }
            }
        }
    }

    /// Execute one sweep across all enabled configs.
    pub async fn sweep(&self) -> SweepSummary {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut summary = SweepSummary {
            started_at,
            duration_ms: 0,
            metrics_processed: 0,
            metrics_skipped: 0,
            metrics_failed: 0,
            anomalies_found: 0,
        };

        let configs = match self.configs.get_all().await {
            Ok(configs) => {
                self.health.set_ok(components::CONFIG_STORE).await;
                configs
            }
            Err(err) => {
                warn!(error = %err, "Failed to load detection configs, skipping sweep");
                self.health
                    .set_degraded(components::CONFIG_STORE, err.to_string())
                    .await;
                self.metrics.inc_sweep_errors();
                return summary;
            }
        };

        let enabled: Vec<_> = configs.into_iter().filter(|c| c.enabled).collect();
        self.metrics.set_configs_enabled(enabled.len() as i64);

        for config in &enabled {
            match self.sweep_metric(config).await {
                Ok(Some(found)) => {
                    summary.metrics_processed += 1;
                    summary.anomalies_found += found;
                }
                Ok(None) => summary.metrics_skipped += 1,
                Err(err) => {
                    summary.metrics_failed += 1;
                    self.metrics.inc_sweep_errors();
                    warn!(
                        metric = %config.metric,
                        error = %err,
                        "Metric sweep failed, continuing with remaining metrics"
                    );
                }
            }
        }

        if summary.metrics_failed == 0 {
            self.health.set_ok(components::METRIC_SOURCE).await;
        } else {
            self.health
                .set_degraded(
                    components::METRIC_SOURCE,
                    format!("{} metric(s) failed this sweep", summary.metrics_failed),
                )
                .await;
        }
        self.health.set_ok(components::SCHEDULER).await;

        if let Ok(active) = self.alerts.active(&AlertFilters::default()).await {
            self.metrics.set_active_alerts(active.len() as i64);
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        self.metrics.inc_sweeps();
        self.metrics
            .observe_sweep_duration(start.elapsed().as_secs_f64());
        self.metrics
            .add_anomalies_detected(summary.anomalies_found as i64);
        self.logger.log_sweep_complete(
            summary.duration_ms,
            summary.metrics_processed,
            summary.metrics_skipped,
            summary.metrics_failed,
            summary.anomalies_found,
        );

        *self.last_sweep.write().await = Some(summary.clone());
        summary
    }

    /// Detect on one metric. `Ok(None)` means skipped for insufficient data.
    async fn sweep_metric(
        &self,
        config: &crate::config::DetectionConfig,
    ) -> Result<Option<usize>> {
        let range = TimeRange::last_days(Utc::now(), self.config.history_days);
        let history = self.source.get_history(&config.metric, range).await?;

        // The latest point is the value under test; the rest is baseline.
        let Some((&current, baseline)) = history.split_last() else {
            return Ok(None);
        };
        if baseline.len() < MIN_HISTORY_POINTS {
            return Ok(None);
        }

        let candidates = self.detector.detect(config, baseline, current);
        let found = candidates.len();

        for anomaly in candidates {
            self.alerts.process(anomaly, &config.channels).await?;
        }

        Ok(Some(found))
    }

    /// Most recent sweep summary, if any sweep has completed.
    pub async fn last_sweep(&self) -> Option<SweepSummary> {
        self.last_sweep.read().await.clone()
    }
}

/// Stops the tick loop. Dropping the handle without calling [`stop`] leaves
/// the scheduler running for the life of the process.
///
/// [`stop`]: SchedulerHandle::stop
pub struct SchedulerHandle {
    shutdown: broadcast::Sender<()>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        let _ = self.shutdown.send(());
    }
}
