//! Monitor service configuration

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// API server port for the operator surface and health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Base URL of the metric aggregation API
    #[serde(default = "default_metrics_api_url")]
    pub metrics_api_url: String,

    /// Seconds between detection sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Days of history handed to the detector
    #[serde(default = "default_history_days")]
    pub history_days: i64,

    /// Cooldown window for repeat alerts, in seconds
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,

    /// Alert retention in the store, in seconds
    #[serde(default = "default_alert_ttl")]
    pub alert_ttl_secs: u64,

    /// Per-channel notification delivery timeout, in seconds
    #[serde(default = "default_dispatch_timeout")]
    pub dispatch_timeout_secs: u64,

    /// Detection config cache TTL, in seconds
    #[serde(default = "default_config_cache_ttl")]
    pub config_cache_ttl_secs: u64,

    /// Optional JSON file of detection configs loaded at startup
    #[serde(default)]
    pub detection_config_file: Option<String>,
}

fn default_api_port() -> u16 {
    8080
}

fn default_metrics_api_url() -> String {
    "http://metrics-api:9090".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_history_days() -> i64 {
    30
}

fn default_cooldown() -> u64 {
    15 * 60
}

fn default_alert_ttl() -> u64 {
    24 * 60 * 60
}

fn default_dispatch_timeout() -> u64 {
    5
}

fn default_config_cache_ttl() -> u64 {
    60 * 60
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            metrics_api_url: default_metrics_api_url(),
            sweep_interval_secs: default_sweep_interval(),
            history_days: default_history_days(),
            cooldown_secs: default_cooldown(),
            alert_ttl_secs: default_alert_ttl(),
            dispatch_timeout_secs: default_dispatch_timeout(),
            config_cache_ttl_secs: default_config_cache_ttl(),
            detection_config_file: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITOR"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn cooldown_window(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn alert_ttl(&self) -> Duration {
        Duration::from_secs(self.alert_ttl_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn config_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config_cache_ttl_secs)
    }
}
