//! Keyed alert persistence with TTL expiry
//!
//! Alerts are never deleted by hand; they age out of the store after the
//! TTL. The in-memory implementation is the single-instance default; a
//! deployment running more than one scheduler must back this trait with a
//! shared keyed store instead.

use crate::error::Result;
use crate::models::AnomalyAlert;
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Default alert retention (24 hours).
pub const DEFAULT_ALERT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Keyed persistence for alerts.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<AnomalyAlert>>;
    /// Insert or overwrite; last writer wins.
    async fn put(&self, alert: AnomalyAlert) -> Result<()>;
    async fn list(&self) -> Result<Vec<AnomalyAlert>>;
}

struct StoredAlert {
    alert: AnomalyAlert,
    expires_at: Instant,
}

/// Process-local alert store with lazy TTL expiry.
pub struct InMemoryAlertStore {
    ttl: Duration,
    entries: DashMap<String, StoredAlert>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_ALERT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, stored| stored.expires_at > now);
    }
}

impl Default for InMemoryAlertStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn get(&self, id: &str) -> Result<Option<AnomalyAlert>> {
        let alert = self.entries.get(id).and_then(|stored| {
            if stored.expires_at > Instant::now() {
                Some(stored.alert.clone())
            } else {
                None
            }
        });
        Ok(alert)
    }

    async fn put(&self, alert: AnomalyAlert) -> Result<()> {
        self.entries.insert(
            alert.id.clone(),
            StoredAlert {
                alert,
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AnomalyAlert>> {
        self.purge_expired();
        Ok(self
            .entries
            .iter()
            .map(|entry| entry.value().alert.clone())
            .collect())
    }
}
