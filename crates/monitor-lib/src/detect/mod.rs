//! Statistical anomaly detection over metric history
//!
//! Runs the algorithms enabled in a metric's [`DetectionConfig`] against an
//! ordered history buffer and the current value. Each algorithm contributes
//! at most one candidate per sweep; candidates are not merged here, the
//! alert manager handles each one individually.

mod severity;
mod stats;

pub use severity::classify as classify_severity;

use crate::config::DetectionConfig;
use crate::models::{Algorithm, Anomaly, AnomalyType, Severity};
use chrono::Utc;
use uuid::Uuid;

/// Minimum history points before any statistical algorithm runs.
pub const MIN_HISTORY_POINTS: usize = 7;

/// Scaling constant relating the MAD to the standard deviation of a normal
/// distribution.
const MAD_NORMAL_CONSISTENCY: f64 = 0.6745;

/// Detector score reported when the current value deviates from a
/// zero-variance baseline, where the true score is unbounded.
const UNBOUNDED_SCORE: f64 = f64::MAX;

fn z_threshold(sensitivity: u8) -> f64 {
    3.0 - f64::from(sensitivity) / 10.0 * 1.5
}

fn iqr_multiplier(sensitivity: u8) -> f64 {
    1.5 + f64::from(10 - sensitivity) * 0.15
}

fn mad_threshold(sensitivity: u8) -> f64 {
    3.5 - f64::from(sensitivity) / 10.0
}

fn isolation_threshold(sensitivity: u8) -> f64 {
    0.7 - f64::from(sensitivity) / 10.0 * 0.3
}

/// An algorithm hit before it is shaped into a full [`Anomaly`].
struct Candidate {
    expected: f64,
    score: f64,
    threshold: f64,
}

/// Runs the configured algorithms against one metric's history.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnomalyDetector;

impl AnomalyDetector {
    pub fn new() -> Self {
        Self
    }

    /// Detect anomalies in `current` against `history`.
    ///
    /// `history` is the ascending day-granular baseline, excluding the
    /// current value. Fewer than [`MIN_HISTORY_POINTS`] points yields an
    /// empty result; insufficient data is not an error.
    pub fn detect(
        &self,
        config: &DetectionConfig,
        history: &[f64],
        current: f64,
    ) -> Vec<Anomaly> {
        if history.len() < MIN_HISTORY_POINTS {
            return Vec::new();
        }

        let mut anomalies = Vec::new();

        if let Some(breach) = self.threshold_breach(config, current) {
            anomalies.push(breach);
        }

        for &algorithm in &config.algorithms {
            let candidate = match algorithm {
                Algorithm::ZScore => Self::z_score(history, current, config.sensitivity),
                Algorithm::Iqr => Self::iqr(history, current, config.sensitivity),
                Algorithm::Mad => Self::mad(history, current, config.sensitivity),
                Algorithm::IsolationScore => {
                    Self::isolation_score(history, current, config.sensitivity)
                }
            };
            if let Some(candidate) = candidate {
                if let Some(anomaly) = Self::build(
                    &config.metric,
                    algorithm,
                    current,
                    candidate,
                    config.sensitivity,
                ) {
                    anomalies.push(anomaly);
                }
            }
        }

        anomalies
    }

    /// Z-score against mean and population stddev.
    ///
    /// A deviation from a perfectly constant baseline is treated as maximal;
    /// a value equal to the constant baseline is not anomalous. Either way
    /// the zero-variance case never divides.
    fn z_score(history: &[f64], current: f64, sensitivity: u8) -> Option<Candidate> {
        let mu = stats::mean(history);
        let sigma = stats::std_dev(history);
        let threshold = z_threshold(sensitivity);

        if sigma < f64::EPSILON {
            if (current - mu).abs() < f64::EPSILON {
                return None;
            }
            return Some(Candidate {
                expected: mu,
                score: UNBOUNDED_SCORE,
                threshold,
            });
        }

        let z = ((current - mu) / sigma).abs();
        (z > threshold).then_some(Candidate {
            expected: mu,
            score: z,
            threshold,
        })
    }

    /// Interquartile-range fence check; expected value is the median.
    fn iqr(history: &[f64], current: f64, sensitivity: u8) -> Option<Candidate> {
        let sorted = stats::sorted(history);
        let (q1, q3) = stats::quartiles_sorted(&sorted);
        let iqr = q3 - q1;
        let multiplier = iqr_multiplier(sensitivity);
        let lower = q1 - multiplier * iqr;
        let upper = q3 + multiplier * iqr;

        if current >= lower && current <= upper {
            return None;
        }

        let distance = if current > upper {
            current - upper
        } else {
            lower - current
        };
        let score = if iqr < f64::EPSILON {
            UNBOUNDED_SCORE
        } else {
            distance / iqr
        };

        Some(Candidate {
            expected: stats::median_sorted(&sorted),
            score,
            threshold: multiplier,
        })
    }

    /// Modified z-score from the median absolute deviation.
    fn mad(history: &[f64], current: f64, sensitivity: u8) -> Option<Candidate> {
        let med = stats::median(history);
        let mad = stats::median_abs_deviation(history, med);
        let threshold = mad_threshold(sensitivity);

        if mad < f64::EPSILON {
            if (current - med).abs() < f64::EPSILON {
                return None;
            }
            return Some(Candidate {
                expected: med,
                score: UNBOUNDED_SCORE,
                threshold,
            });
        }

        let modified_z = (MAD_NORMAL_CONSISTENCY * (current - med) / mad).abs();
        (modified_z > threshold).then_some(Candidate {
            expected: med,
            score: modified_z,
            threshold,
        })
    }

    /// Simplified isolation score: distance from the mean in units of three
    /// standard deviations, clamped to [0, 1].
    fn isolation_score(history: &[f64], current: f64, sensitivity: u8) -> Option<Candidate> {
        let mu = stats::mean(history);
        let sigma = stats::std_dev(history);
        let threshold = isolation_threshold(sensitivity);

        let score = if sigma < f64::EPSILON {
            if (current - mu).abs() < f64::EPSILON {
                0.0
            } else {
                1.0
            }
        } else {
            ((current - mu).abs() / (3.0 * sigma)).min(1.0)
        };

        (score > threshold).then_some(Candidate {
            expected: mu,
            score,
            threshold,
        })
    }

    /// Hard min/max limit check, independent of the statistical algorithms.
    /// A breach is always `high` severity; deviation is the percent distance
    /// from the breached bound.
    fn threshold_breach(&self, config: &DetectionConfig, current: f64) -> Option<Anomaly> {
        let thresholds = config.thresholds.as_ref()?;

        let (bound, which) = if thresholds.max.is_some_and(|max| current > max) {
            (thresholds.max?, "max")
        } else if thresholds.min.is_some_and(|min| current < min) {
            (thresholds.min?, "min")
        } else {
            return None;
        };

        let deviation = if bound.abs() < f64::EPSILON {
            0.0
        } else {
            (current - bound) / bound * 100.0
        };

        Some(Anomaly {
            id: Uuid::new_v4().to_string(),
            metric: config.metric.clone(),
            anomaly_type: AnomalyType::ThresholdBreach,
            severity: Severity::High,
            observed: current,
            expected: bound,
            deviation_percent: deviation,
            detected_at: Utc::now(),
            description: format!(
                "{} breached configured {} threshold {:.2}: observed {:.2}",
                config.metric, which, bound, current
            ),
            algorithm: None,
            score: current,
            threshold: bound,
        })
    }

    /// Shape an algorithm hit into an [`Anomaly`]. Returns `None` when the
    /// expected value is zero, where the deviation percentage is undefined.
    fn build(
        metric: &str,
        algorithm: Algorithm,
        current: f64,
        candidate: Candidate,
        sensitivity: u8,
    ) -> Option<Anomaly> {
        if candidate.expected.abs() < f64::EPSILON {
            return None;
        }

        let deviation = (current - candidate.expected) / candidate.expected * 100.0;
        let anomaly_type = Self::classify_type(current, candidate.expected);
        let severity = severity::classify(deviation, sensitivity);

        Some(Anomaly {
            id: Uuid::new_v4().to_string(),
            metric: metric.to_string(),
            anomaly_type,
            severity,
            observed: current,
            expected: candidate.expected,
            deviation_percent: deviation,
            detected_at: Utc::now(),
            description: format!(
                "{} flagged {}: observed {:.2}, expected {:.2} ({:+.1}%)",
                algorithm, metric, current, candidate.expected, deviation
            ),
            algorithm: Some(algorithm),
            score: candidate.score,
            threshold: candidate.threshold,
        })
    }

    /// Spike above 1.5x expected, drop below 0.5x expected, outlier between.
    fn classify_type(current: f64, expected: f64) -> AnomalyType {
        if current > 1.5 * expected {
            AnomalyType::Spike
        } else if current < 0.5 * expected {
            AnomalyType::Drop
        } else {
            AnomalyType::Outlier
        }
    }
}
