//! Observability infrastructure for the anomaly monitor
//!
//! Provides:
//! - Prometheus metrics (sweep duration, detection and alert counters)
//! - Structured JSON event logging with tracing

use prometheus::{register_histogram, register_int_gauge, Histogram, IntGauge};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use crate::models::{AnomalyAlert, Severity};

/// Histogram buckets for sweep duration (in seconds). Sweeps are dominated
/// by per-metric history fetches, so the range is wider than a single
/// request latency.
const SWEEP_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    sweep_duration_seconds: Histogram,
    sweeps_total: IntGauge,
    sweep_errors_total: IntGauge,
    anomalies_detected_total: IntGauge,
    alerts_created_total: IntGauge,
    alerts_suppressed_total: IntGauge,
    dispatch_failures_total: IntGauge,
    active_alerts: IntGauge,
    configs_enabled: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            sweep_duration_seconds: register_histogram!(
                "anomaly_monitor_sweep_duration_seconds",
                "Time spent running one detection sweep across all metrics",
                SWEEP_BUCKETS.to_vec()
            )
            .expect("Failed to register sweep_duration_seconds"),

            sweeps_total: register_int_gauge!(
                "anomaly_monitor_sweeps_total",
                "Total number of detection sweeps executed"
            )
            .expect("Failed to register sweeps_total"),

            sweep_errors_total: register_int_gauge!(
                "anomaly_monitor_sweep_errors_total",
                "Total number of per-metric failures during sweeps"
            )
            .expect("Failed to register sweep_errors_total"),

            anomalies_detected_total: register_int_gauge!(
                "anomaly_monitor_anomalies_detected_total",
                "Total number of anomaly candidates produced by detection"
            )
            .expect("Failed to register anomalies_detected_total"),

            alerts_created_total: register_int_gauge!(
                "anomaly_monitor_alerts_created_total",
                "Total number of alerts accepted and persisted"
            )
            .expect("Failed to register alerts_created_total"),

            alerts_suppressed_total: register_int_gauge!(
                "anomaly_monitor_alerts_suppressed_total",
                "Total number of candidates dropped by cooldown suppression"
            )
            .expect("Failed to register alerts_suppressed_total"),

            dispatch_failures_total: register_int_gauge!(
                "anomaly_monitor_dispatch_failures_total",
                "Total number of failed notification deliveries"
            )
            .expect("Failed to register dispatch_failures_total"),

            active_alerts: register_int_gauge!(
                "anomaly_monitor_active_alerts",
                "Number of currently unresolved alerts"
            )
            .expect("Failed to register active_alerts"),

            configs_enabled: register_int_gauge!(
                "anomaly_monitor_configs_enabled",
                "Number of metric configs enabled for detection"
            )
            .expect("Failed to register configs_enabled"),
        }
    }
}

/// Monitor metrics for Prometheus exposition.
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_sweep_duration(&self, duration_secs: f64) {
        self.inner().sweep_duration_seconds.observe(duration_secs);
    }

    pub fn inc_sweeps(&self) {
        self.inner().sweeps_total.inc();
    }

    pub fn inc_sweep_errors(&self) {
        self.inner().sweep_errors_total.inc();
    }

    pub fn add_anomalies_detected(&self, count: i64) {
        self.inner().anomalies_detected_total.add(count);
    }

    pub fn inc_alerts_created(&self) {
        self.inner().alerts_created_total.inc();
    }

    pub fn inc_alerts_suppressed(&self) {
        self.inner().alerts_suppressed_total.inc();
    }

    pub fn inc_dispatch_failures(&self) {
        self.inner().dispatch_failures_total.inc();
    }

    pub fn set_active_alerts(&self, count: i64) {
        self.inner().active_alerts.set(count);
    }

    pub fn set_configs_enabled(&self, count: i64) {
        self.inner().configs_enabled.set(count);
    }
}

/// Structured logger for monitor events
///
/// Provides consistent JSON-formatted logging for detections, alert
/// lifecycle changes, and service events.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log an accepted alert
    pub fn log_alert_created(&self, alert: &AnomalyAlert) {
        let anomaly = &alert.anomaly;
        match anomaly.severity {
            Severity::Critical | Severity::High => {
                warn!(
                    event = "alert_created",
                    service = %self.service,
                    alert_id = %alert.id,
                    metric = %anomaly.metric,
                    anomaly_type = %anomaly.anomaly_type,
                    severity = %anomaly.severity,
                    observed = anomaly.observed,
                    expected = anomaly.expected,
                    deviation_percent = anomaly.deviation_percent,
                    "Alert created"
                );
            }
            _ => {
                info!(
                    event = "alert_created",
                    service = %self.service,
                    alert_id = %alert.id,
                    metric = %anomaly.metric,
                    anomaly_type = %anomaly.anomaly_type,
                    severity = %anomaly.severity,
                    observed = anomaly.observed,
                    expected = anomaly.expected,
                    deviation_percent = anomaly.deviation_percent,
                    "Alert created"
                );
            }
        }
    }

    /// Log a candidate dropped by cooldown suppression. Expected behavior,
    /// so debug level only.
    pub fn log_alert_suppressed(&self, metric: &str, anomaly_type: &str) {
        debug!(
            event = "alert_suppressed",
            service = %self.service,
            metric = %metric,
            anomaly_type = %anomaly_type,
            "Candidate suppressed by active cooldown"
        );
    }

    pub fn log_alert_acknowledged(&self, alert_id: &str, by: &str) {
        info!(
            event = "alert_acknowledged",
            service = %self.service,
            alert_id = %alert_id,
            acknowledged_by = %by,
            "Alert acknowledged"
        );
    }

    pub fn log_alert_resolved(&self, alert_id: &str, has_notes: bool) {
        info!(
            event = "alert_resolved",
            service = %self.service,
            alert_id = %alert_id,
            has_notes = has_notes,
            "Alert resolved"
        );
    }

    pub fn log_dispatch_failure(&self, alert_id: &str, channel: &str, reason: &str) {
        warn!(
            event = "dispatch_failed",
            service = %self.service,
            alert_id = %alert_id,
            channel = %channel,
            reason = %reason,
            "Notification dispatch failed"
        );
    }

    pub fn log_sweep_complete(
        &self,
        duration_ms: u64,
        metrics_processed: usize,
        metrics_skipped: usize,
        metrics_failed: usize,
        anomalies_found: usize,
    ) {
        debug!(
            event = "sweep_complete",
            service = %self.service,
            duration_ms = duration_ms,
            metrics_processed = metrics_processed,
            metrics_skipped = metrics_skipped,
            metrics_failed = metrics_failed,
            anomalies_found = anomalies_found,
            "Detection sweep complete"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "monitor_started",
            service = %self.service,
            version = %version,
            "Anomaly monitor started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            service = %self.service,
            reason = %reason,
            "Anomaly monitor shutting down"
        );
    }
}
