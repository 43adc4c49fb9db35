//! Boundary to the metric aggregation pipeline

use crate::error::Result;
use crate::models::TimeRange;
use async_trait::async_trait;

/// Supplies day-granular numeric history for a metric.
///
/// Implementations live at the platform boundary (warehouse queries, HTTP
/// adapters). The sequence is ascending in time and may hold fewer points
/// than the range spans for sparse data; callers treat short series as
/// "skip this metric", not as an error. Fetches should carry their own
/// bounded timeout.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn get_history(&self, metric: &str, range: TimeRange) -> Result<Vec<f64>>;
}
