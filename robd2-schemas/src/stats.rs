use serde::{Deserialize, Serialize};

/// Quality statistics over the current sliding window of O2 readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// `mean - desired_o2_pct`
    pub error: f64,
    pub cv_pct: f64,
    pub sem: f64,
    pub stability_pct: f64,
    pub drift: f64,
}
