//! Alert lifecycle management
//!
//! Owns cooldown suppression, persistence, lifecycle events, and
//! notification dispatch for accepted detections.

pub mod cooldown;
pub mod dispatch;
pub mod events;
pub mod store;

pub use cooldown::{CooldownTracker, DEFAULT_COOLDOWN_WINDOW};
pub use dispatch::{LogDispatcher, NotificationDispatcher, DEFAULT_DISPATCH_TIMEOUT};
pub use events::{AlertEvent, AlertEventBus, AlertEventKind};
pub use store::{AlertStore, InMemoryAlertStore, DEFAULT_ALERT_TTL};

use crate::error::{MonitorError, Result};
use crate::models::{
    AlertChannel, AlertFilters, AlertStatistics, Anomaly, AnomalyAlert, TimeRange,
};
use crate::observability::{MonitorMetrics, StructuredLogger};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Accepts detections into alerts and drives their lifecycle.
pub struct AlertManager {
    store: Arc<dyn AlertStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    cooldowns: CooldownTracker,
    events: AlertEventBus,
    dispatch_timeout: Duration,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

impl AlertManager {
    pub fn new(store: Arc<dyn AlertStore>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            cooldowns: CooldownTracker::new(),
            events: AlertEventBus::new(),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            metrics: MonitorMetrics::new(),
            logger: StructuredLogger::new("alert-manager"),
        }
    }

    /// Set a custom cooldown window.
    pub fn with_cooldown_window(mut self, window: Duration) -> Self {
        self.cooldowns = CooldownTracker::with_window(window);
        self
    }

    /// Set a custom per-channel dispatch timeout.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AlertEvent> {
        self.events.subscribe()
    }

    /// Process one detection candidate.
    ///
    /// Candidates inside an active cooldown for their (metric, type) pair
    /// are dropped silently; that is expected suppression, not a failure.
    /// Otherwise the alert is persisted, a cooldown marker is written, an
    /// `anomaly-detected` event is emitted, and each configured channel gets
    /// one best-effort delivery attempt.
    pub async fn process(
        &self,
        anomaly: Anomaly,
        channels: &[AlertChannel],
    ) -> Result<Option<AnomalyAlert>> {
        if self.cooldowns.is_active(&anomaly.metric, anomaly.anomaly_type) {
            self.logger
                .log_alert_suppressed(&anomaly.metric, &anomaly.anomaly_type.to_string());
            self.metrics.inc_alerts_suppressed();
            return Ok(None);
        }

        let alert = AnomalyAlert::new(anomaly);
        self.store.put(alert.clone()).await?;
        self.cooldowns
            .mark(&alert.anomaly.metric, alert.anomaly.anomaly_type);

        self.metrics.inc_alerts_created();
        self.logger.log_alert_created(&alert);
        self.events.publish(AlertEventKind::AnomalyDetected, &alert);

        self.dispatch(&alert, channels).await;

        Ok(Some(alert))
    }

    /// Attempt delivery on every channel concurrently. A failing or hanging
    /// channel is logged and never blocks or aborts its siblings; there is
    /// no automatic retry.
    async fn dispatch(&self, alert: &AnomalyAlert, channels: &[AlertChannel]) {
        let mut attempts = Vec::with_capacity(channels.len());
        for &channel in channels {
            let dispatcher = Arc::clone(&self.dispatcher);
            let alert = alert.clone();
            let timeout = self.dispatch_timeout;
            let task = tokio::spawn(async move {
                tokio::time::timeout(timeout, dispatcher.send(channel, &alert)).await
            });
            attempts.push((channel, task));
        }

        for (channel, task) in attempts {
            let reason = match task.await {
                Ok(Ok(Ok(()))) => continue,
                Ok(Ok(Err(err))) => err.to_string(),
                Ok(Err(_)) => "delivery timed out".to_string(),
                Err(err) => format!("dispatch task failed: {}", err),
            };
            self.metrics.inc_dispatch_failures();
            self.logger
                .log_dispatch_failure(&alert.id, &channel.to_string(), &reason);
        }
    }

    /// Mark an alert acknowledged by an operator.
    pub async fn acknowledge(&self, alert_id: &str, by: &str) -> Result<AnomalyAlert> {
        let mut alert = self
            .store
            .get(alert_id)
            .await?
            .ok_or_else(|| MonitorError::AlertNotFound(alert_id.to_string()))?;

        alert.acknowledged = true;
        alert.acknowledged_by = Some(by.to_string());
        alert.acknowledged_at = Some(Utc::now());
        self.store.put(alert.clone()).await?;

        self.logger.log_alert_acknowledged(&alert.id, by);
        self.events
            .publish(AlertEventKind::AnomalyAcknowledged, &alert);
        Ok(alert)
    }

    /// Resolve an alert. Resolving an already-resolved alert overwrites the
    /// notes and timestamp; the relaxation is intentional.
    pub async fn resolve(&self, alert_id: &str, notes: Option<String>) -> Result<AnomalyAlert> {
        let mut alert = self
            .store
            .get(alert_id)
            .await?
            .ok_or_else(|| MonitorError::AlertNotFound(alert_id.to_string()))?;

        alert.resolved = true;
        alert.resolved_at = Some(Utc::now());
        alert.resolution_notes = notes;
        self.store.put(alert.clone()).await?;

        self.logger
            .log_alert_resolved(&alert.id, alert.resolution_notes.is_some());
        self.events.publish(AlertEventKind::AnomalyResolved, &alert);
        Ok(alert)
    }

    /// All non-resolved alerts matching the filters, newest first.
    pub async fn active(&self, filters: &AlertFilters) -> Result<Vec<AnomalyAlert>> {
        let mut alerts: Vec<AnomalyAlert> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|alert| !alert.resolved && filters.matches(alert))
            .collect();
        alerts.sort_by(|a, b| b.alerted_at.cmp(&a.alerted_at));
        Ok(alerts)
    }

    /// All alerts in the time range matching the filters, regardless of
    /// resolution state, newest first.
    pub async fn history(
        &self,
        range: TimeRange,
        filters: &AlertFilters,
    ) -> Result<Vec<AnomalyAlert>> {
        let mut alerts: Vec<AnomalyAlert> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|alert| range.contains(alert.alerted_at) && filters.matches(alert))
            .collect();
        alerts.sort_by(|a, b| b.alerted_at.cmp(&a.alerted_at));
        Ok(alerts)
    }

    /// Aggregate counts over the time range.
    pub async fn statistics(&self, range: TimeRange) -> Result<AlertStatistics> {
        let alerts = self.history(range, &AlertFilters::default()).await?;

        let mut by_severity: HashMap<String, usize> = HashMap::new();
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut by_metric: HashMap<String, usize> = HashMap::new();
        let mut resolved = 0usize;
        let mut resolution_minutes = Vec::new();

        for alert in &alerts {
            *by_severity
                .entry(alert.anomaly.severity.to_string())
                .or_default() += 1;
            *by_type
                .entry(alert.anomaly.anomaly_type.to_string())
                .or_default() += 1;
            *by_metric.entry(alert.anomaly.metric.clone()).or_default() += 1;

            if alert.resolved {
                resolved += 1;
                if let Some(resolved_at) = alert.resolved_at {
                    let minutes =
                        (resolved_at - alert.alerted_at).num_seconds() as f64 / 60.0;
                    resolution_minutes.push(minutes);
                }
            }
        }

        let avg_resolution_minutes = if resolution_minutes.is_empty() {
            None
        } else {
            Some(resolution_minutes.iter().sum::<f64>() / resolution_minutes.len() as f64)
        };

        Ok(AlertStatistics {
            total: alerts.len(),
            by_severity,
            by_type,
            by_metric,
            resolved,
            unresolved: alerts.len() - resolved,
            avg_resolution_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Algorithm, AnomalyType, Severity};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_anomaly(metric: &str, anomaly_type: AnomalyType) -> Anomaly {
        Anomaly {
            id: uuid::Uuid::new_v4().to_string(),
            metric: metric.to_string(),
            anomaly_type,
            severity: Severity::High,
            observed: 500.0,
            expected: 100.0,
            deviation_percent: 400.0,
            detected_at: Utc::now(),
            description: format!("test anomaly on {}", metric),
            algorithm: Some(Algorithm::ZScore),
            score: 6.0,
            threshold: 2.25,
        }
    }

    fn manager() -> AlertManager {
        AlertManager::new(Arc::new(InMemoryAlertStore::new()), Arc::new(LogDispatcher))
    }

    /// Dispatcher that fails on slack and counts every attempt.
    struct FlakyDispatcher {
        attempts: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl NotificationDispatcher for FlakyDispatcher {
        async fn send(&self, channel: AlertChannel, _alert: &AnomalyAlert) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if channel == AlertChannel::Slack {
                return Err(MonitorError::Dispatch {
                    channel: channel.to_string(),
                    reason: "webhook 500".to_string(),
                });
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_repeat_detection_within_cooldown_persists_once() {
        let manager = manager();

        let first = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();
        assert!(first.is_some());

        let second = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();
        assert!(second.is_none());

        let active = manager.active(&AlertFilters::default()).await.unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_scoped_per_metric_and_type() {
        let manager = manager();

        manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();
        let other_type = manager
            .process(sample_anomaly("revenue", AnomalyType::Drop), &[])
            .await
            .unwrap();
        let other_metric = manager
            .process(sample_anomaly("error_rate", AnomalyType::Spike), &[])
            .await
            .unwrap();

        assert!(other_type.is_some());
        assert!(other_metric.is_some());
    }

    #[tokio::test]
    async fn test_cooldown_reopens_after_window() {
        let manager = manager().with_cooldown_window(Duration::from_millis(30));

        manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let again = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();
        assert!(again.is_some());
    }

    #[tokio::test]
    async fn test_lifecycle_flags() {
        let manager = manager();
        let alert = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap()
            .unwrap();
        assert!(!alert.acknowledged);
        assert!(!alert.resolved);

        let acked = manager.acknowledge(&alert.id, "ops").await.unwrap();
        assert!(acked.acknowledged);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("ops"));
        assert!(acked.acknowledged_at.is_some());

        let resolved = manager
            .resolve(&alert.id, Some("fixed".to_string()))
            .await
            .unwrap();
        assert!(resolved.resolved);
        assert_eq!(resolved.resolution_notes.as_deref(), Some("fixed"));
        assert!(resolved.resolved_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_alert_id_is_not_found() {
        let manager = manager();

        let ack = manager.acknowledge("missing", "ops").await;
        assert!(matches!(ack, Err(MonitorError::AlertNotFound(_))));

        let resolve = manager.resolve("missing", None).await;
        assert!(matches!(resolve, Err(MonitorError::AlertNotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_and_overwrites_notes() {
        let manager = manager();
        let alert = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap()
            .unwrap();

        manager
            .resolve(&alert.id, Some("first pass".to_string()))
            .await
            .unwrap();
        let second = manager
            .resolve(&alert.id, Some("second pass".to_string()))
            .await
            .unwrap();

        assert!(second.resolved);
        assert_eq!(second.resolution_notes.as_deref(), Some("second pass"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_does_not_block_other_channels() {
        let dispatcher = Arc::new(FlakyDispatcher {
            attempts: AtomicUsize::new(0),
        });
        let manager = AlertManager::new(Arc::new(InMemoryAlertStore::new()), dispatcher.clone());

        let channels = [AlertChannel::Slack, AlertChannel::Email, AlertChannel::Webhook];
        let alert = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &channels)
            .await
            .unwrap();

        // All three channels were attempted despite the slack failure, and
        // the alert itself was still accepted.
        assert!(alert.is_some());
        assert_eq!(dispatcher.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_active_excludes_resolved_and_sorts_newest_first() {
        let manager = manager();

        let first = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = manager
            .process(sample_anomaly("users", AnomalyType::Drop), &[])
            .await
            .unwrap()
            .unwrap();

        manager.resolve(&first.id, None).await.unwrap();

        let active = manager.active(&AlertFilters::default()).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        let range = TimeRange::last_days(Utc::now(), 1);
        let history = manager.history(range, &AlertFilters::default()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
    }

    #[tokio::test]
    async fn test_active_filters_by_metric() {
        let manager = manager();
        manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();
        manager
            .process(sample_anomaly("users", AnomalyType::Spike), &[])
            .await
            .unwrap();

        let filters = AlertFilters {
            metric: Some("users".to_string()),
            ..Default::default()
        };
        let active = manager.active(&filters).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].anomaly.metric, "users");
    }

    #[tokio::test]
    async fn test_statistics_counts_and_resolution_time() {
        let manager = manager();

        let a = manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap()
            .unwrap();
        let b = manager
            .process(sample_anomaly("users", AnomalyType::Drop), &[])
            .await
            .unwrap()
            .unwrap();
        manager
            .process(sample_anomaly("transactions", AnomalyType::Outlier), &[])
            .await
            .unwrap();

        manager.resolve(&a.id, None).await.unwrap();
        manager.resolve(&b.id, Some("noise".to_string())).await.unwrap();

        let stats = manager
            .statistics(TimeRange::last_days(Utc::now(), 1))
            .await
            .unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.by_metric.get("revenue"), Some(&1));
        assert_eq!(stats.by_type.get("spike"), Some(&1));
        assert_eq!(stats.by_severity.get("high"), Some(&3));
        // Two alerts carry resolved_at; the mean is tiny but present.
        let avg = stats.avg_resolution_minutes.unwrap();
        assert!(avg >= 0.0 && avg < 1.0);
    }

    #[tokio::test]
    async fn test_statistics_without_resolutions_has_no_average() {
        let manager = manager();
        manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();

        let stats = manager
            .statistics(TimeRange::last_days(Utc::now(), 1))
            .await
            .unwrap();
        assert_eq!(stats.resolved, 0);
        assert_eq!(stats.unresolved, 1);
        assert!(stats.avg_resolution_minutes.is_none());
    }

    #[tokio::test]
    async fn test_detected_event_emitted() {
        let manager = manager();
        let mut rx = manager.subscribe();

        manager
            .process(sample_anomaly("revenue", AnomalyType::Spike), &[])
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, AlertEventKind::AnomalyDetected);
        assert_eq!(event.alert.anomaly.metric, "revenue");
    }
}
