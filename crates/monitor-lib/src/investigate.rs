//! Historical context assembly for a single alert

use crate::alert::AlertStore;
use crate::error::{MonitorError, Result};
use crate::models::{AnomalyAlert, TimeRange};
use crate::source::MetricSource;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Days of metric history pulled for context, ending at the alert time.
pub const HISTORY_WINDOW_DAYS: i64 = 30;

/// Window for similar prior alerts, preceding the alert time.
pub const SIMILAR_WINDOW_DAYS: i64 = 7;

/// Cap on similar prior alerts returned.
pub const MAX_SIMILAR_ALERTS: usize = 5;

/// One day of metric history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One lifecycle step of the investigated alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub label: String,
    pub at: DateTime<Utc>,
    pub detail: String,
}

/// Everything an operator needs to judge one alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub alert: AnomalyAlert,
    pub history: Vec<MetricPoint>,
    pub similar_alerts: Vec<AnomalyAlert>,
    pub timeline: Vec<TimelineEntry>,
    /// Cross-metric correlation is an extension point; always empty today.
    pub related_metrics: Vec<String>,
}

/// Assembles investigation context from the alert store and metric source.
pub struct InvestigationService {
    store: Arc<dyn AlertStore>,
    source: Arc<dyn MetricSource>,
}

impl InvestigationService {
    pub fn new(store: Arc<dyn AlertStore>, source: Arc<dyn MetricSource>) -> Self {
        Self { store, source }
    }

    pub async fn investigate(&self, alert_id: &str) -> Result<Investigation> {
        let alert = self
            .store
            .get(alert_id)
            .await?
            .ok_or_else(|| MonitorError::AlertNotFound(alert_id.to_string()))?;

        let range = TimeRange::last_days(alert.alerted_at, HISTORY_WINDOW_DAYS);
        let values = self
            .source
            .get_history(&alert.anomaly.metric, range)
            .await?;
        let history = daily_points(&values, alert.alerted_at);

        let similar_alerts = self.similar_alerts(&alert).await?;
        let timeline = build_timeline(&alert);

        Ok(Investigation {
            alert,
            history,
            similar_alerts,
            timeline,
            related_metrics: Vec::new(),
        })
    }

    /// Prior alerts for the same (metric, type) within the preceding window,
    /// excluding the alert itself, most recent first.
    async fn similar_alerts(&self, alert: &AnomalyAlert) -> Result<Vec<AnomalyAlert>> {
        let cutoff = alert.alerted_at - chrono::Duration::days(SIMILAR_WINDOW_DAYS);

        let mut similar: Vec<AnomalyAlert> = self
            .store
            .list()
            .await?
            .into_iter()
            .filter(|other| {
                other.id != alert.id
                    && other.anomaly.metric == alert.anomaly.metric
                    && other.anomaly.anomaly_type == alert.anomaly.anomaly_type
                    && other.alerted_at <= alert.alerted_at
                    && other.alerted_at >= cutoff
            })
            .collect();
        similar.sort_by(|a, b| b.alerted_at.cmp(&a.alerted_at));
        similar.truncate(MAX_SIMILAR_ALERTS);
        Ok(similar)
    }
}

/// Pair an ascending day-granular series with dates ending at `end`.
fn daily_points(values: &[f64], end: DateTime<Utc>) -> Vec<MetricPoint> {
    let n = values.len() as i64;
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| MetricPoint {
            date: (end - chrono::Duration::days(n - 1 - i as i64)).date_naive(),
            value,
        })
        .collect()
}

fn build_timeline(alert: &AnomalyAlert) -> Vec<TimelineEntry> {
    let mut timeline = vec![TimelineEntry {
        label: "Detected".to_string(),
        at: alert.alerted_at,
        detail: alert.anomaly.description.clone(),
    }];

    if alert.acknowledged {
        if let Some(at) = alert.acknowledged_at {
            timeline.push(TimelineEntry {
                label: "Acknowledged".to_string(),
                at,
                detail: format!(
                    "Acknowledged by {}",
                    alert.acknowledged_by.as_deref().unwrap_or("unknown")
                ),
            });
        }
    }

    if alert.resolved {
        if let Some(at) = alert.resolved_at {
            timeline.push(TimelineEntry {
                label: "Resolved".to_string(),
                at,
                detail: alert
                    .resolution_notes
                    .clone()
                    .unwrap_or_else(|| "Resolved".to_string()),
            });
        }
    }

    timeline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::InMemoryAlertStore;
    use crate::models::{Algorithm, Anomaly, AnomalyType, Severity};
    use async_trait::async_trait;

    struct FlatSource;

    #[async_trait]
    impl MetricSource for FlatSource {
        async fn get_history(&self, _metric: &str, _range: TimeRange) -> Result<Vec<f64>> {
            Ok(vec![100.0; 30])
        }
    }

    fn alert_at(metric: &str, anomaly_type: AnomalyType, alerted_at: DateTime<Utc>) -> AnomalyAlert {
        let mut alert = AnomalyAlert::new(Anomaly {
            id: uuid::Uuid::new_v4().to_string(),
            metric: metric.to_string(),
            anomaly_type,
            severity: Severity::High,
            observed: 500.0,
            expected: 100.0,
            deviation_percent: 400.0,
            detected_at: alerted_at,
            description: "spike on revenue".to_string(),
            algorithm: Some(Algorithm::ZScore),
            score: 6.0,
            threshold: 2.25,
        });
        alert.alerted_at = alerted_at;
        alert
    }

    fn service(store: Arc<InMemoryAlertStore>) -> InvestigationService {
        InvestigationService::new(store, Arc::new(FlatSource))
    }

    #[tokio::test]
    async fn test_unknown_alert_is_not_found() {
        let svc = service(Arc::new(InMemoryAlertStore::new()));
        let err = svc.investigate("missing").await.unwrap_err();
        assert!(matches!(err, MonitorError::AlertNotFound(_)));
    }

    #[tokio::test]
    async fn test_timeline_starts_with_detected() {
        let store = Arc::new(InMemoryAlertStore::new());
        let alert = alert_at("revenue", AnomalyType::Spike, Utc::now());
        let id = alert.id.clone();
        store.put(alert).await.unwrap();

        let investigation = service(store).investigate(&id).await.unwrap();
        assert_eq!(investigation.timeline[0].label, "Detected");
        assert_eq!(investigation.timeline.len(), 1);
        assert!(investigation.related_metrics.is_empty());
    }

    #[tokio::test]
    async fn test_timeline_includes_lifecycle_steps() {
        let store = Arc::new(InMemoryAlertStore::new());
        let mut alert = alert_at("revenue", AnomalyType::Spike, Utc::now());
        alert.acknowledged = true;
        alert.acknowledged_by = Some("ops".to_string());
        alert.acknowledged_at = Some(Utc::now());
        alert.resolved = true;
        alert.resolved_at = Some(Utc::now());
        alert.resolution_notes = Some("rolled back deploy".to_string());
        let id = alert.id.clone();
        store.put(alert).await.unwrap();

        let investigation = service(store).investigate(&id).await.unwrap();
        let labels: Vec<&str> = investigation
            .timeline
            .iter()
            .map(|entry| entry.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Detected", "Acknowledged", "Resolved"]);
        assert_eq!(investigation.timeline[2].detail, "rolled back deploy");
    }

    #[tokio::test]
    async fn test_history_is_dated_ascending_to_alert_day() {
        let store = Arc::new(InMemoryAlertStore::new());
        let alert = alert_at("revenue", AnomalyType::Spike, Utc::now());
        let id = alert.id.clone();
        let alerted_at = alert.alerted_at;
        store.put(alert).await.unwrap();

        let investigation = service(store).investigate(&id).await.unwrap();
        assert_eq!(investigation.history.len(), 30);
        assert_eq!(
            investigation.history.last().unwrap().date,
            alerted_at.date_naive()
        );
        assert!(investigation
            .history
            .windows(2)
            .all(|pair| pair[0].date < pair[1].date));
    }

    #[tokio::test]
    async fn test_similar_alerts_scoped_capped_and_ordered() {
        let store = Arc::new(InMemoryAlertStore::new());
        let now = Utc::now();

        let subject = alert_at("revenue", AnomalyType::Spike, now);
        let id = subject.id.clone();
        store.put(subject).await.unwrap();

        // Seven prior spikes within the window, one outside it, one of a
        // different type, one on a different metric.
        for hours in 1..=7 {
            store
                .put(alert_at(
                    "revenue",
                    AnomalyType::Spike,
                    now - chrono::Duration::hours(hours),
                ))
                .await
                .unwrap();
        }
        store
            .put(alert_at(
                "revenue",
                AnomalyType::Spike,
                now - chrono::Duration::days(8),
            ))
            .await
            .unwrap();
        store
            .put(alert_at("revenue", AnomalyType::Drop, now))
            .await
            .unwrap();
        store
            .put(alert_at("users", AnomalyType::Spike, now))
            .await
            .unwrap();

        let investigation = service(store).investigate(&id).await.unwrap();
        let similar = &investigation.similar_alerts;

        assert_eq!(similar.len(), MAX_SIMILAR_ALERTS);
        assert!(similar.iter().all(|a| a.id != id));
        assert!(similar
            .iter()
            .all(|a| a.anomaly.metric == "revenue"
                && a.anomaly.anomaly_type == AnomalyType::Spike));
        assert!(similar
            .windows(2)
            .all(|pair| pair[0].alerted_at >= pair[1].alerted_at));
    }
}
