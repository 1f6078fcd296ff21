//! Per-reading accept/review decision.
//!
//! The rule first checks whether a 95% margin around the window error keeps
//! the target inside the acceptance band, then falls back to a flat absolute
//! error tolerance. The fallback can upgrade an interval failure to `PASS`.

use crate::constants::{ABSOLUTE_ERROR_TOLERANCE, BAND_REVIEW_MARGIN, Z_95};
use robd2_schemas::{
    altitude::AltitudeSpec,
    verdict::{BandStatus, Verdict},
};

pub fn evaluate(error: f64, window_size: usize, spec: &AltitudeSpec) -> Verdict {
    if window_size == 0 || !error.is_finite() {
        return Verdict::Error;
    }

    let margin = Z_95 * error.abs() / (window_size as f64).sqrt();
    let lower = error - margin;
    let upper = error + margin;
    if !margin.is_finite() {
        return Verdict::Error;
    }

    let interval_in_band =
        spec.contains(spec.desired_o2_pct + upper) && spec.contains(spec.desired_o2_pct + lower);

    if interval_in_band || error.abs() < ABSOLUTE_ERROR_TOLERANCE {
        Verdict::Pass
    } else {
        Verdict::Review
    }
}

/// Instantaneous band check on one raw O2 value.
pub fn band_status(o2_pct: f64, spec: &AltitudeSpec) -> BandStatus {
    if spec.contains(o2_pct) {
        BandStatus::Passed
    } else if spec.range_min - BAND_REVIEW_MARGIN <= o2_pct && o2_pct <= spec.range_max + BAND_REVIEW_MARGIN {
        BandStatus::Review
    } else {
        BandStatus::NotPassed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEA_LEVEL: AltitudeSpec = AltitudeSpec::new(0, 21.0, 20.9, 21.1);

    #[test]
    fn small_error_passes_interval_check() {
        assert_eq!(evaluate(0.05, 12, &SEA_LEVEL), Verdict::Pass);
        assert_eq!(evaluate(-0.05, 12, &SEA_LEVEL), Verdict::Pass);
    }

    #[test]
    fn large_error_needs_review() {
        assert_eq!(evaluate(2.0, 12, &SEA_LEVEL), Verdict::Review);
        assert_eq!(evaluate(-1.5, 12, &SEA_LEVEL), Verdict::Review);
    }

    #[test]
    fn absolute_tolerance_upgrades_interval_failure() {
        // 21.5 is well outside [20.9, 21.1] but |0.5| < 1.5
        assert_eq!(evaluate(0.5, 12, &SEA_LEVEL), Verdict::Pass);
        assert_eq!(evaluate(1.49, 1, &SEA_LEVEL), Verdict::Pass);
    }

    #[test]
    fn degenerate_input_is_error() {
        assert_eq!(evaluate(0.05, 0, &SEA_LEVEL), Verdict::Error);
        assert_eq!(evaluate(f64::NAN, 12, &SEA_LEVEL), Verdict::Error);
        assert_eq!(evaluate(f64::INFINITY, 12, &SEA_LEVEL), Verdict::Error);
    }

    #[test]
    fn band_status_levels() {
        assert_eq!(band_status(21.0, &SEA_LEVEL), BandStatus::Passed);
        assert_eq!(band_status(21.5, &SEA_LEVEL), BandStatus::Review);
        assert_eq!(band_status(20.5, &SEA_LEVEL), BandStatus::Review);
        assert_eq!(band_status(21.7, &SEA_LEVEL), BandStatus::NotPassed);
    }
}
