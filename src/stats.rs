//! Shared numeric helpers
//!
//! Small descriptive statistics used by all calculators. Every function takes
//! a borrowed slice and sorts a private copy when order matters, so callers can
//! share one input across threads.

/// Euclidean distance between two points
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by n)
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Bessel-corrected sample standard deviation (divides by n - 1)
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Coefficient of variation using the population standard deviation.
///
/// `None` with fewer than two values or a non-positive mean.
pub fn population_cv(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    Some(population_std_dev(values)? / m)
}

/// Coefficient of variation using the Bessel-corrected standard deviation
pub fn sample_cv(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m <= 0.0 {
        return None;
    }
    Some(sample_std_dev(values)? / m)
}

/// Ascending copy of the values
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Percentile of already sorted values with linear interpolation between ranks.
///
/// `p` is in [0, 1]. `None` for an empty slice.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Drop values above `percentile(p) * factor`, preserving input order
pub fn filter_above_percentile(values: &[f64], p: f64, factor: f64) -> Vec<f64> {
    let sorted = sorted_copy(values);
    match percentile_sorted(&sorted, p) {
        Some(cutoff) => {
            let limit = cutoff * factor;
            values.iter().copied().filter(|&v| v <= limit).collect()
        }
        None => Vec::new(),
    }
}

/// Drop values outside `[Q1 - k*IQR, Q3 + k*IQR]`, preserving input order
pub fn iqr_filter(values: &[f64], k: f64) -> Vec<f64> {
    let sorted = sorted_copy(values);
    let (Some(q1), Some(q3)) = (
        percentile_sorted(&sorted, 0.25),
        percentile_sorted(&sorted, 0.75),
    ) else {
        return Vec::new();
    };
    let iqr = q3 - q1;
    let low = q1 - k * iqr;
    let high = q3 + k * iqr;
    values
        .iter()
        .copied()
        .filter(|&v| v >= low && v <= high)
        .collect()
}

/// `numerator / denominator`, or 0 when the denominator is zero
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
