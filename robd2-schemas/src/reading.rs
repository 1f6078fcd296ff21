use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One decoded sample from the device.
///
/// Built at the device-link boundary from a `GET RUN ALL` frame plus the two
/// ADC voltages. `timestamp` is the host capture time; `device_timestamp` is
/// whatever clock string the device reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub device_timestamp: String,
    pub altitude_ft: i32,
    pub o2_conc_pct: f64,
    pub voltage_primary: f64,
    pub voltage_secondary: f64,
    pub breathing_loop_pressure: f64,
    pub program_id: String,
    pub final_altitude: String,
    pub elapsed_time: String,
    pub remaining_time: String,
    pub spo2: Option<f64>,
    pub pulse: Option<f64>,
}
