//! Domain constants that encode real device behaviour.
//!
//! The timing values reflect how long the ROBD2 takes to answer a command and
//! to re-equilibrate its gas mixture. They are the defaults for
//! [`MonitorTiming`] and [`CalibrationTiming`], which tests and the CLI may
//! override.

use std::time::Duration;

/// Capacity of the sliding O2 window.
pub const WINDOW_CAPACITY: usize = 12;

/// Readings within this period after an altitude change are not scored.
pub const STABILIZATION_WINDOW: Duration = Duration::from_secs(25);

/// Pause between two sampling cycles.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Pause after a cycle that produced no usable reading.
pub const TRANSPORT_BACKOFF: Duration = Duration::from_millis(500);

/// How long to wait for a single response line.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between consecutive commands within one sampling cycle.
pub const COMMAND_GAP: Duration = Duration::from_millis(100);

/// Wall-clock length of each calibration phase.
pub const CALIBRATION_PHASE_DURATION: Duration = Duration::from_secs(30);

/// Two-sided 95% normal quantile.
pub const Z_95: f64 = 1.96;

/// Absolute error (percentage points) below which an interval failure still passes.
pub const ABSOLUTE_ERROR_TOLERANCE: f64 = 1.5;

/// Distance outside the acceptance band still reported as `REVIEW` by the band check.
pub const BAND_REVIEW_MARGIN: f64 = 0.5;

/// Passing readings an altitude needs before the final report accepts it.
pub const MIN_PASSES_PER_ALTITUDE: u32 = 3;

/// Ground level; returning here after testing a higher altitude ends the test.
pub const GROUND_ALTITUDE_FT: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorTiming {
    pub stabilization: Duration,
    pub sample_interval: Duration,
    pub backoff: Duration,
    pub response_timeout: Duration,
    pub command_gap: Duration,
}

impl Default for MonitorTiming {
    fn default() -> Self {
        Self {
            stabilization: STABILIZATION_WINDOW,
            sample_interval: SAMPLE_INTERVAL,
            backoff: TRANSPORT_BACKOFF,
            response_timeout: RESPONSE_TIMEOUT,
            command_gap: COMMAND_GAP,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationTiming {
    pub phase_duration: Duration,
    pub sample_interval: Duration,
    pub backoff: Duration,
    pub response_timeout: Duration,
    pub command_gap: Duration,
}

impl Default for CalibrationTiming {
    fn default() -> Self {
        Self {
            phase_duration: CALIBRATION_PHASE_DURATION,
            sample_interval: SAMPLE_INTERVAL,
            backoff: TRANSPORT_BACKOFF,
            response_timeout: RESPONSE_TIMEOUT,
            command_gap: COMMAND_GAP,
        }
    }
}
