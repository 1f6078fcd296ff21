use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub o2_conc_pct: f64,
    pub voltage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    RoomAir,
    PureO2,
}

impl CalibrationPhase {
    pub const ALL: [CalibrationPhase; 2] = [CalibrationPhase::RoomAir, CalibrationPhase::PureO2];

    /// Segment label used in calibration logs.
    pub fn label(&self) -> &'static str {
        match self {
            CalibrationPhase::RoomAir => "Room Air",
            CalibrationPhase::PureO2 => "100% O2",
        }
    }
}

impl fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Voltage summary for one calibration phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPhaseResult {
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub samples: usize,
}
