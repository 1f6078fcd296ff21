//! Descriptive and quality statistics over a window of O2 readings.
//!
//! Degenerate inputs fall back to documented defaults (`std_dev`, `sem` and
//! `drift` are 0 for windows too small to define them). Only an empty window or
//! a non-finite value is a fault, and the caller turns that into an `ERROR`
//! verdict instead of aborting the session.

use robd2_schemas::{altitude::AltitudeSpec, stats::StatSnapshot};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatisticsFault {
    #[error("cannot compute statistics over an empty window")]
    EmptyWindow,

    #[error("window contains a non-finite value ({0})")]
    NonFiniteInput(f64),

    #[error("computed {0} is not finite")]
    NonFiniteResult(&'static str),
}

pub fn compute(values: &[f64], spec: &AltitudeSpec) -> Result<StatSnapshot, StatisticsFault> {
    if values.is_empty() {
        return Err(StatisticsFault::EmptyWindow);
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(StatisticsFault::NonFiniteInput(*bad));
    }

    let n = values.len();
    let mean = mean(values);
    let median = median(values);
    let std_dev = sample_std_dev(values, mean);

    let error = mean - spec.desired_o2_pct;
    let cv_pct = if mean != 0.0 { (std_dev / mean) * 100.0 } else { 0.0 };
    let sem = if n >= 2 { std_dev / (n as f64).sqrt() } else { 0.0 };

    let in_range = values.iter().filter(|&&v| spec.contains(v)).count();
    let stability_pct = in_range as f64 / n as f64 * 100.0;

    let snapshot = StatSnapshot {
        mean,
        median,
        std_dev,
        error,
        cv_pct,
        sem,
        stability_pct,
        drift: drift(values),
    };

    for (name, value) in [
        ("mean", snapshot.mean),
        ("median", snapshot.median),
        ("std_dev", snapshot.std_dev),
        ("cv", snapshot.cv_pct),
        ("sem", snapshot.sem),
        ("drift", snapshot.drift),
    ] {
        if !value.is_finite() {
            return Err(StatisticsFault::NonFiniteResult(name));
        }
    }

    Ok(snapshot)
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median, averaging the two middle values for even lengths; 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

// Sample (n - 1) standard deviation, 0 below two values.
fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}

/// Mean of the last third minus mean of the first third, thirds truncated to `n / 3`.
pub fn drift(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let third = n / 3;
    mean(&values[n - third..]) - mean(&values[..third])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SEA_LEVEL: AltitudeSpec = AltitudeSpec::new(0, 21.0, 20.9, 21.1);

    #[test]
    fn single_value_uses_defaults() {
        let stats = compute(&[21.05], &SEA_LEVEL).unwrap();
        assert_abs_diff_eq!(stats.mean, 21.05);
        assert_abs_diff_eq!(stats.median, 21.05);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.sem, 0.0);
        assert_eq!(stats.drift, 0.0);
        assert_abs_diff_eq!(stats.error, 0.05, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.stability_pct, 100.0);
    }

    #[test]
    fn drift_compares_outer_thirds() {
        let values = [20.0, 20.0, 20.0, 22.0, 22.0, 22.0];
        assert_abs_diff_eq!(drift(&values), 2.0);

        // n = 7 -> thirds of 2: [1, 2] vs [6, 7]
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_abs_diff_eq!(drift(&values), 5.0);
        assert_eq!(drift(&[1.0, 9.0]), 0.0);
    }

    #[test]
    fn quality_metrics_over_mixed_window() {
        let values = [20.8, 21.0, 21.0, 21.2];
        let stats = compute(&values, &SEA_LEVEL).unwrap();

        assert_abs_diff_eq!(stats.mean, 21.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.median, 21.0, epsilon = 1e-9);
        // deviations: -0.2, 0, 0, 0.2 -> sum_sq 0.08 / 3
        let expected_sd = (0.08f64 / 3.0).sqrt();
        assert_abs_diff_eq!(stats.std_dev, expected_sd, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.sem, expected_sd / 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.cv_pct, expected_sd / 21.0 * 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(stats.stability_pct, 50.0);
        assert_abs_diff_eq!(stats.error, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_mean_has_zero_cv() {
        let stats = compute(&[0.0, 0.0], &SEA_LEVEL).unwrap();
        assert_eq!(stats.cv_pct, 0.0);
    }

    #[test]
    fn faults_instead_of_panicking() {
        assert_eq!(compute(&[], &SEA_LEVEL), Err(StatisticsFault::EmptyWindow));
        assert!(matches!(
            compute(&[21.0, f64::NAN], &SEA_LEVEL),
            Err(StatisticsFault::NonFiniteInput(_))
        ));
    }

    #[test]
    fn median_of_even_window() {
        assert_abs_diff_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_abs_diff_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }
}
