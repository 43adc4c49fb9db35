//! HTTP adapter to the metric aggregation API

use async_trait::async_trait;
use monitor_lib::{source::MetricSource, MonitorError, Result, TimeRange};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Per-fetch timeout owned by this source.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Day-granular history as served by the aggregation API.
#[derive(Debug, Deserialize)]
struct HistoryResponse {
    values: Vec<f64>,
}

/// Fetches metric history over HTTP from the aggregation pipeline.
pub struct HttpMetricSource {
    client: Client,
    base_url: Url,
}

impl HttpMetricSource {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(FETCH_TIMEOUT).build()?;
        let base_url = Url::parse(base_url)?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn get_history(&self, metric: &str, range: TimeRange) -> Result<Vec<f64>> {
        let unavailable = |reason: String| MonitorError::SourceUnavailable {
            metric: metric.to_string(),
            reason,
        };

        let mut url = self
            .base_url
            .join(&format!("api/v1/metrics/{}/history", metric))
            .map_err(|e| unavailable(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("start", &range.start.to_rfc3339())
            .append_pair("end", &range.end.to_rfc3339());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unavailable(format!(
                "history endpoint returned {}",
                response.status()
            )));
        }

        let history: HistoryResponse = response
            .json()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        Ok(history.values)
    }
}
