//! Error types for the anomaly monitor

use thiserror::Error;

/// Errors surfaced by the monitor library.
///
/// Insufficient metric history is deliberately not represented here; a short
/// series means "skip this metric for the sweep", not a failure.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Unknown alert id in acknowledge/resolve/investigate.
    #[error("alert not found: {0}")]
    AlertNotFound(String),

    /// The metric history pipeline could not serve a fetch.
    #[error("metric source unavailable for {metric}: {reason}")]
    SourceUnavailable { metric: String, reason: String },

    /// Rejected at config load or upsert, never silently ignored at
    /// detection time.
    #[error("invalid detection config for {metric}: {reason}")]
    InvalidConfig { metric: String, reason: String },

    /// The alert store failed to read or write.
    #[error("alert store failure: {0}")]
    Store(String),

    /// A notification channel rejected a delivery. Logged by the caller,
    /// never propagated out of alert processing.
    #[error("dispatch to {channel} failed: {reason}")]
    Dispatch { channel: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MonitorError>;
