//! Cooldown suppression for repeat alerts
//!
//! A marker keyed by (metric, anomaly type) is written whenever an alert is
//! accepted; while it is active, further candidates for the same pair are
//! dropped. Markers self-expire, so a race at the window boundary costs at
//! worst one duplicate alert.

use crate::models::AnomalyType;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default cooldown window (15 minutes).
pub const DEFAULT_COOLDOWN_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CooldownKey {
    metric: String,
    anomaly_type: AnomalyType,
}

/// Tracks active cooldown markers per (metric, anomaly type).
pub struct CooldownTracker {
    window: Duration,
    recent: RwLock<HashMap<CooldownKey, Instant>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_COOLDOWN_WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            recent: RwLock::new(HashMap::new()),
        }
    }

    /// Whether a marker for this pair is still active.
    pub fn is_active(&self, metric: &str, anomaly_type: AnomalyType) -> bool {
        let key = CooldownKey {
            metric: metric.to_string(),
            anomaly_type,
        };
        let recent = self.recent.read().unwrap();
        recent
            .get(&key)
            .is_some_and(|written| written.elapsed() < self.window)
    }

    /// Write a marker for this pair and drop any expired ones.
    pub fn mark(&self, metric: &str, anomaly_type: AnomalyType) {
        let key = CooldownKey {
            metric: metric.to_string(),
            anomaly_type,
        };
        let mut recent = self.recent.write().unwrap();
        recent.insert(key, Instant::now());
        let window = self.window;
        recent.retain(|_, written| written.elapsed() < window);
    }
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}
