//! Core data models for the anomaly monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of deviation a detection represents.
///
/// Derived from the relation of the observed value to the expected value,
/// never set independently of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    Spike,
    Drop,
    TrendChange,
    Outlier,
    PatternBreak,
    ThresholdBreach,
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyType::Spike => write!(f, "spike"),
            AnomalyType::Drop => write!(f, "drop"),
            AnomalyType::TrendChange => write!(f, "trend_change"),
            AnomalyType::Outlier => write!(f, "outlier"),
            AnomalyType::PatternBreak => write!(f, "pattern_break"),
            AnomalyType::ThresholdBreach => write!(f, "threshold_breach"),
        }
    }
}

/// Severity tier of an anomaly.
///
/// Ordered so that `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Statistical algorithms an operator can enable per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    ZScore,
    Iqr,
    Mad,
    IsolationScore,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::ZScore => write!(f, "z_score"),
            Algorithm::Iqr => write!(f, "iqr"),
            Algorithm::Mad => write!(f, "mad"),
            Algorithm::IsolationScore => write!(f, "isolation_score"),
        }
    }
}

/// Notification channel an alert can be delivered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertChannel {
    Email,
    Slack,
    Webhook,
}

impl std::fmt::Display for AlertChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertChannel::Email => write!(f, "email"),
            AlertChannel::Slack => write!(f, "slack"),
            AlertChannel::Webhook => write!(f, "webhook"),
        }
    }
}

/// A single detected deviation, produced by one algorithm run against one
/// metric. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: String,
    pub metric: String,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub observed: f64,
    pub expected: f64,
    pub deviation_percent: f64,
    pub detected_at: DateTime<Utc>,
    pub description: String,
    /// `None` for threshold breaches, which bypass the statistical algorithms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,
    /// Raw detector score (z, modified z, band distance or isolation score).
    pub score: f64,
    /// Threshold the score was compared against.
    pub threshold: f64,
}

/// Lifecycle state of an alert, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Acknowledged,
    Resolved,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Open => write!(f, "open"),
            AlertStatus::Acknowledged => write!(f, "acknowledged"),
            AlertStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Lifecycle wrapper around an [`Anomaly`], 1:1 with it (shared id).
///
/// Transitions: Open -> Acknowledged -> Resolved, or Open -> Resolved
/// directly. Resolved is terminal; alerts are never re-opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyAlert {
    pub id: String,
    pub anomaly: Anomaly,
    pub alerted_at: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

impl AnomalyAlert {
    /// Wrap a fresh detection in an open alert.
    pub fn new(anomaly: Anomaly) -> Self {
        Self {
            id: anomaly.id.clone(),
            anomaly,
            alerted_at: Utc::now(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved: false,
            resolved_at: None,
            resolution_notes: None,
        }
    }

    pub fn status(&self) -> AlertStatus {
        if self.resolved {
            AlertStatus::Resolved
        } else if self.acknowledged {
            AlertStatus::Acknowledged
        } else {
            AlertStatus::Open
        }
    }
}

/// Inclusive UTC time range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Range spanning the `days` days that end at `end`.
    pub fn last_days(end: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: end - chrono::Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// Optional filters for alert queries. Empty filters match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFilters {
    pub metric: Option<String>,
    pub severity: Option<Severity>,
    pub anomaly_type: Option<AnomalyType>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl AlertFilters {
    pub fn matches(&self, alert: &AnomalyAlert) -> bool {
        if let Some(ref metric) = self.metric {
            if alert.anomaly.metric != *metric {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if alert.anomaly.severity != severity {
                return false;
            }
        }
        if let Some(anomaly_type) = self.anomaly_type {
            if alert.anomaly.anomaly_type != anomaly_type {
                return false;
            }
        }
        if let Some(since) = self.since {
            if alert.alerted_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if alert.alerted_at > until {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts over a set of alerts within a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertStatistics {
    pub total: usize,
    pub by_severity: HashMap<String, usize>,
    pub by_type: HashMap<String, usize>,
    pub by_metric: HashMap<String, usize>,
    pub resolved: usize,
    pub unresolved: usize,
    /// Mean minutes from `alerted_at` to `resolved_at`, over alerts that are
    /// resolved and carry a resolution timestamp. `None` when no alert
    /// qualifies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_resolution_minutes: Option<f64>,
}
