//! Descriptive statistics over metric history buffers

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation. Zero for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mu = mean(values);
    let variance =
        values.iter().map(|&x| (x - mu).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Ascending copy of the input.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Median of an already-sorted slice. Zero for an empty slice.
pub fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Median of an unsorted slice.
pub fn median(values: &[f64]) -> f64 {
    median_sorted(&sorted(values))
}

/// First and third quartiles of an already-sorted slice, taken at the
/// floor(n*0.25) and floor(n*0.75) positions.
pub fn quartiles_sorted(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let q1 = sorted[(n as f64 * 0.25).floor() as usize];
    let q3 = sorted[((n as f64 * 0.75).floor() as usize).min(n - 1)];
    (q1, q3)
}

/// Median absolute deviation around the given center.
pub fn median_abs_deviation(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|&x| (x - center).abs()).collect();
    median(&deviations)
}
