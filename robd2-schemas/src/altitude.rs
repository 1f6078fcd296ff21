use serde::{Deserialize, Serialize};

/// Target O2 concentration and acceptance band for one simulated altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeSpec {
    pub altitude_ft: i32,
    pub desired_o2_pct: f64,
    pub range_min: f64,
    pub range_max: f64,
}

impl AltitudeSpec {
    pub const fn new(altitude_ft: i32, desired_o2_pct: f64, range_min: f64, range_max: f64) -> Self {
        Self {
            altitude_ft,
            desired_o2_pct,
            range_min,
            range_max,
        }
    }

    /// True when `value` lies inside the closed acceptance band.
    pub fn contains(&self, value: f64) -> bool {
        self.range_min <= value && value <= self.range_max
    }

    pub fn is_well_formed(&self) -> bool {
        self.range_min <= self.desired_o2_pct && self.desired_o2_pct <= self.range_max
    }
}
