//! Severity classification for anomaly candidates

use crate::models::Severity;

/// Map a deviation magnitude and operator sensitivity to a severity tier.
///
/// Pure and deterministic. Raising sensitivity lowers every boundary, so for
/// a fixed deviation the tier never decreases as sensitivity increases:
/// critical at |d| >= 100 - 5s, high at |d| >= 50 - 2s, medium at
/// |d| >= 20 - s, otherwise low.
pub fn classify(deviation_percent: f64, sensitivity: u8) -> Severity {
    let magnitude = deviation_percent.abs();
    let s = f64::from(sensitivity);

    if magnitude >= 100.0 - s * 5.0 {
        Severity::Critical
    } else if magnitude >= 50.0 - s * 2.0 {
        Severity::High
    } else if magnitude >= 20.0 - s {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify(42.0, 5), classify(42.0, 5));
        }
    }

    #[test]
    fn test_boundaries_at_sensitivity_five() {
        // Boundaries: critical >= 75, high >= 40, medium >= 15.
        assert_eq!(classify(75.0, 5), Severity::Critical);
        assert_eq!(classify(74.9, 5), Severity::High);
        assert_eq!(classify(40.0, 5), Severity::High);
        assert_eq!(classify(39.9, 5), Severity::Medium);
        assert_eq!(classify(15.0, 5), Severity::Medium);
        assert_eq!(classify(14.9, 5), Severity::Low);
    }

    #[test]
    fn test_sign_is_ignored() {
        assert_eq!(classify(-80.0, 5), classify(80.0, 5));
    }

    #[test]
    fn test_monotone_in_deviation() {
        for sensitivity in 1..=10u8 {
            let mut last = classify(0.0, sensitivity);
            for step in 0..400 {
                let tier = classify(step as f64 * 0.5, sensitivity);
                assert!(tier >= last, "severity regressed at |d|={}", step as f64 * 0.5);
                last = tier;
            }
        }
    }

    #[test]
    fn test_monotone_in_sensitivity() {
        // All else equal, more sensitivity never yields a lower tier.
        for deviation in [5.0, 18.0, 35.0, 60.0, 90.0, 120.0] {
            let mut last = classify(deviation, 1);
            for sensitivity in 2..=10u8 {
                let tier = classify(deviation, sensitivity);
                assert!(tier >= last);
                last = tier;
            }
        }
    }

    #[test]
    fn test_extreme_sensitivities() {
        // s=10: critical from 50%. s=1: critical only from 95%.
        assert_eq!(classify(50.0, 10), Severity::Critical);
        assert_eq!(classify(94.0, 1), Severity::High);
        assert_eq!(classify(95.0, 1), Severity::Critical);
    }
}
