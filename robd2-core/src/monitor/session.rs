use super::ReadingOutcome;
use crate::{
    constants::{MonitorTiming, GROUND_ALTITUDE_FT},
    results::{AltitudeResults, FinalReport},
    spec_table::SpecificationTable,
    stabilization::StabilizationTracker,
    statistics,
    verdict::{band_status, evaluate},
    window::SlidingWindow,
};
use robd2_schemas::{
    reading::Reading,
    verdict::{StabilizationState, Verdict},
};
use std::time::Instant;
use tracing::{debug, info, warn};

/// All mutable state of one performance test run.
///
/// The ingestion loop is the only writer. Observers get owned
/// [`ReadingOutcome`]s and [`FinalReport`]s, never references into this state.
pub struct MonitoringSession {
    pub(super) spec_table: SpecificationTable,
    pub(super) tracker: StabilizationTracker,
    pub(super) window: SlidingWindow,
    pub(super) results: AltitudeResults,
    pub(super) timing: MonitorTiming,
    pub(super) device_id: Option<String>,
    pub(super) running: bool,
    pub(super) final_report: Option<FinalReport>,
}

impl MonitoringSession {
    /// Resets all state and begins accepting readings. Returns false, with a
    /// warning, when the session is already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            warn!("Monitoring is already running");
            return false;
        }
        self.tracker.reset();
        self.window.clear();
        self.results.clear();
        self.final_report = None;
        self.running = true;
        info!(device = ?self.device_id, "Started performance monitoring");
        true
    }

    /// Stops accepting readings. Any final report stays available.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            warn!("Monitoring is not running");
            return false;
        }
        self.running = false;
        info!("Performance monitoring stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn on_reading(&mut self, reading: Reading) -> Option<ReadingOutcome> {
        self.on_reading_at(reading, Instant::now())
    }

    /// Processes one reading taken at `now`. Returns `None` when the session
    /// is not accepting readings.
    pub fn on_reading_at(&mut self, reading: Reading, now: Instant) -> Option<ReadingOutcome> {
        if !self.running {
            debug!(altitude = reading.altitude_ft, "reading ignored, session not running");
            return None;
        }

        let altitude = reading.altitude_ft;
        let observation = self.tracker.observe(altitude, now, &mut self.window);
        self.window.push(reading.o2_conc_pct);
        let values = self.window.to_vec();
        let window_mean = statistics::mean(&values);

        let spec = self.spec_table.lookup(altitude).copied();
        let mut stats = None;
        let verdict = match (spec, observation.state) {
            (None, _) => {
                debug!(altitude, "no specification for altitude, reading unscored");
                None
            }
            (Some(_), StabilizationState::Stabilizing) => Some(Verdict::Stabilizing),
            (Some(spec), StabilizationState::Settled) => {
                let verdict = match statistics::compute(&values, &spec) {
                    Ok(snapshot) => {
                        stats = Some(snapshot);
                        evaluate(snapshot.error, values.len(), &spec)
                    }
                    Err(fault) => {
                        warn!(altitude, %fault, "statistics failed, scoring reading as ERROR");
                        Verdict::Error
                    }
                };
                self.results.record(altitude, verdict, stats);
                Some(verdict)
            }
        };

        let band = spec.map(|s| band_status(reading.o2_conc_pct, &s));

        let completed = if altitude == GROUND_ALTITUDE_FT
            && self.results.any_completed_above(GROUND_ALTITUDE_FT)
        {
            let report = self.results.final_report(self.device_id.clone(), reading.timestamp);
            info!(verdict = %report.verdict, altitudes = report.altitudes.len(), "Returned to ground, test complete");
            self.running = false;
            self.final_report = Some(report.clone());
            Some(report)
        } else {
            None
        };

        Some(ReadingOutcome {
            reading,
            state: observation.state,
            stabilization_remaining: observation.remaining,
            spec,
            stats,
            window_mean,
            verdict,
            band,
            completed,
        })
    }

    pub fn results(&self) -> &AltitudeResults {
        &self.results
    }

    pub fn final_report(&self) -> Option<&FinalReport> {
        self.final_report.as_ref()
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn timing(&self) -> &MonitorTiming {
        &self.timing
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn spec_table(&self) -> &SpecificationTable {
        &self.spec_table
    }
}
