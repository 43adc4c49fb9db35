//! Notification delivery boundary
//!
//! Transport implementations (email, Slack, webhook senders) live in the
//! host platform. The monitor only needs best-effort, per-channel delivery
//! with no built-in retry; failures are logged by the caller.

use crate::error::Result;
use crate::models::{AlertChannel, AnomalyAlert};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Default per-channel delivery timeout.
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, channel: AlertChannel, alert: &AnomalyAlert) -> Result<()>;
}

/// Logs notifications instead of delivering them. Used until the platform's
/// channel senders are wired in.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn send(&self, channel: AlertChannel, alert: &AnomalyAlert) -> Result<()> {
        info!(
            channel = %channel,
            alert_id = %alert.id,
            metric = %alert.anomaly.metric,
            severity = %alert.anomaly.severity,
            "Notification (log only): {}",
            alert.anomaly.description
        );
        Ok(())
    }
}
