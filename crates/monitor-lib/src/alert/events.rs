//! Lifecycle event bus
//!
//! AlertManager publishes lifecycle events here; dashboard and notification
//! consumers subscribe. Broadcast semantics: slow subscribers lag and drop,
//! publishing never blocks the alert path.

use crate::models::AnomalyAlert;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_BUS_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertEventKind {
    AnomalyDetected,
    AnomalyAcknowledged,
    AnomalyResolved,
}

impl std::fmt::Display for AlertEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertEventKind::AnomalyDetected => write!(f, "anomaly-detected"),
            AlertEventKind::AnomalyAcknowledged => write!(f, "anomaly-acknowledged"),
            AlertEventKind::AnomalyResolved => write!(f, "anomaly-resolved"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertEventKind,
    pub alert: AnomalyAlert,
    pub emitted_at: DateTime<Utc>,
}

/// Cloneable handle to the broadcast channel.
#[derive(Clone)]
pub struct AlertEventBus {
    tx: broadcast::Sender<AlertEvent>,
}

impl AlertEventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, kind: AlertEventKind, alert: &AnomalyAlert) {
        let _ = self.tx.send(AlertEvent {
            kind,
            alert: alert.clone(),
            emitted_at: Utc::now(),
        });
    }
}

impl Default for AlertEventBus {
    fn default() -> Self {
        Self::new()
    }
}
