//! Per-metric detection configuration and the cached config store
//!
//! Operators create and update [`DetectionConfig`]s; the scheduler reads
//! them once per sweep through [`CachedConfigStore`], whose coarse TTL means
//! out-of-band changes may take up to the TTL to take effect. That staleness
//! is documented behavior, not a defect.

use crate::error::{MonitorError, Result};
use crate::models::{AlertChannel, Algorithm};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const SENSITIVITY_MIN: u8 = 1;
pub const SENSITIVITY_MAX: u8 = 10;

/// Default TTL for the sweep-side config cache (1 hour).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Optional hard limits for a metric. A current value outside the band is a
/// threshold breach regardless of what the statistical algorithms say.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Detection settings for a single metric, keyed by metric name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    pub metric: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Operator dial 1-10; higher is more sensitive on every algorithm.
    #[serde(default = "default_sensitivity")]
    pub sensitivity: u8,
    #[serde(default)]
    pub algorithms: Vec<Algorithm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    #[serde(default)]
    pub channels: Vec<AlertChannel>,
}

fn default_enabled() -> bool {
    true
}

fn default_sensitivity() -> u8 {
    5
}

impl DetectionConfig {
    /// Validate at load/upsert time; malformed configs fail fast instead of
    /// being silently ignored during detection.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| MonitorError::InvalidConfig {
            metric: self.metric.clone(),
            reason,
        };

        if self.metric.trim().is_empty() {
            return Err(invalid("metric name is empty".to_string()));
        }
        if !(SENSITIVITY_MIN..=SENSITIVITY_MAX).contains(&self.sensitivity) {
            return Err(invalid(format!(
                "sensitivity {} outside {}..={}",
                self.sensitivity, SENSITIVITY_MIN, SENSITIVITY_MAX
            )));
        }
        if let Some(thresholds) = &self.thresholds {
            if thresholds.min.is_none() && thresholds.max.is_none() {
                return Err(invalid("thresholds set but neither bound given".to_string()));
            }
            if let (Some(min), Some(max)) = (thresholds.min, thresholds.max) {
                if min > max {
                    return Err(invalid(format!(
                        "threshold min {} exceeds max {}",
                        min, max
                    )));
                }
            }
        }
        if self.algorithms.is_empty() && self.thresholds.is_none() {
            return Err(invalid(
                "no algorithms and no thresholds configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Durable store for detection configs.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<DetectionConfig>>;
    async fn get(&self, metric: &str) -> Result<Option<DetectionConfig>>;
    async fn upsert(&self, config: DetectionConfig) -> Result<()>;
}

/// Process-local config store keyed by metric name.
#[derive(Default)]
pub struct InMemoryConfigStore {
    configs: DashMap<String, DetectionConfig>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, validating every config.
    pub fn with_configs(configs: Vec<DetectionConfig>) -> Result<Self> {
        let store = Self::new();
        for config in configs {
            config.validate()?;
            store.configs.insert(config.metric.clone(), config);
        }
        Ok(store)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get_all(&self) -> Result<Vec<DetectionConfig>> {
        let mut configs: Vec<DetectionConfig> =
            self.configs.iter().map(|entry| entry.value().clone()).collect();
        configs.sort_by(|a, b| a.metric.cmp(&b.metric));
        Ok(configs)
    }

    async fn get(&self, metric: &str) -> Result<Option<DetectionConfig>> {
        Ok(self.configs.get(metric).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, config: DetectionConfig) -> Result<()> {
        config.validate()?;
        self.configs.insert(config.metric.clone(), config);
        Ok(())
    }
}

struct CacheEntry {
    fetched_at: Instant,
    configs: Vec<DetectionConfig>,
}

/// TTL cache in front of a [`ConfigStore`], read once per sweep.
///
/// Upserts routed through this wrapper invalidate the cache, so operator
/// changes made via the API are visible on the next sweep; only changes made
/// behind the wrapper's back wait out the TTL.
pub struct CachedConfigStore {
    inner: Arc<dyn ConfigStore>,
    ttl: Duration,
    cache: RwLock<Option<CacheEntry>>,
}

impl CachedConfigStore {
    pub fn new(inner: Arc<dyn ConfigStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(None),
        }
    }

    pub async fn get_all(&self) -> Result<Vec<DetectionConfig>> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.as_ref() {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.configs.clone());
                }
            }
        }

        let configs = self.inner.get_all().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            fetched_at: Instant::now(),
            configs: configs.clone(),
        });
        Ok(configs)
    }

    pub async fn get(&self, metric: &str) -> Result<Option<DetectionConfig>> {
        let configs = self.get_all().await?;
        Ok(configs.into_iter().find(|c| c.metric == metric))
    }

    pub async fn upsert(&self, config: DetectionConfig) -> Result<()> {
        self.inner.upsert(config).await?;
        self.invalidate().await;
        Ok(())
    }

    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }
}
