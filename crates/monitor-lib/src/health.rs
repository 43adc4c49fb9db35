//! Component health tracking for liveness and readiness probes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health state of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Ok,
    Degraded,
    Failed,
}

impl HealthState {
    /// Whether the component can still serve its purpose.
    pub fn is_serving(&self) -> bool {
        matches!(self, HealthState::Ok | HealthState::Degraded)
    }
}

/// Latest report for a component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentReport {
    pub state: HealthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub updated_at: i64,
}

impl ComponentReport {
    fn now(state: HealthState, detail: Option<String>) -> Self {
        Self {
            state,
            detail,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Component names tracked by the monitor.
pub mod components {
    pub const SCHEDULER: &str = "scheduler";
    pub const CONFIG_STORE: &str = "config_store";
    pub const METRIC_SOURCE: &str = "metric_source";
    pub const ALERT_STORE: &str = "alert_store";
    pub const DISPATCHER: &str = "dispatcher";
}

/// Aggregate health over all registered components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub state: HealthState,
    pub components: HashMap<String, ComponentReport>,
}

/// Readiness answer for the probe endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Shared registry of component health reports.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentReport>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, initially healthy.
    pub async fn register(&self, name: &str) {
        self.report(name, HealthState::Ok, None).await;
    }

    pub async fn report(&self, name: &str, state: HealthState, detail: Option<String>) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentReport::now(state, detail));
    }

    pub async fn set_ok(&self, name: &str) {
        self.report(name, HealthState::Ok, None).await;
    }

    pub async fn set_degraded(&self, name: &str, detail: impl Into<String>) {
        self.report(name, HealthState::Degraded, Some(detail.into())).await;
    }

    pub async fn set_failed(&self, name: &str, detail: impl Into<String>) {
        self.report(name, HealthState::Failed, Some(detail.into())).await;
    }

    /// Flip readiness; set once startup wiring completes.
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Aggregate snapshot: failed beats degraded beats ok.
    pub async fn snapshot(&self) -> HealthSnapshot {
        let components = self.components.read().await.clone();
        let mut state = HealthState::Ok;
        for report in components.values() {
            match report.state {
                HealthState::Failed => {
                    state = HealthState::Failed;
                    break;
                }
                HealthState::Degraded => state = HealthState::Degraded,
                HealthState::Ok => {}
            }
        }
        HealthSnapshot { state, components }
    }

    pub async fn readiness(&self) -> Readiness {
        if !*self.ready.read().await {
            return Readiness {
                ready: false,
                reason: Some("monitor not yet initialized".to_string()),
            };
        }
        let snapshot = self.snapshot().await;
        if !snapshot.state.is_serving() {
            return Readiness {
                ready: false,
                reason: Some("critical component failed".to_string()),
            };
        }
        Readiness {
            ready: true,
            reason: None,
        }
    }
}
