//! Two-phase calibration recorder: room air, then 100% O2.
//!
//! The summary is diagnostic only. Nothing here writes calibration values
//! back to the device.

use crate::{
    constants::CalibrationTiming,
    device::{self, DeviceFault, DeviceLink},
    error::Robd2Error,
    logger::CalibrationLogger,
    statistics,
};
use chrono::Local;
use crossbeam::channel::{self, Receiver, Sender};
use robd2_schemas::calibration::{CalibrationPhase, CalibrationPhaseResult, CalibrationSample};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Write as _,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationSession {
    device_id: Option<String>,
    room_air: Vec<CalibrationSample>,
    pure_o2: Vec<CalibrationSample>,
}

impl CalibrationSession {
    pub fn new(device_id: Option<String>) -> Self {
        Self {
            device_id,
            ..Self::default()
        }
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn record(&mut self, phase: CalibrationPhase, sample: CalibrationSample) {
        match phase {
            CalibrationPhase::RoomAir => self.room_air.push(sample),
            CalibrationPhase::PureO2 => self.pure_o2.push(sample),
        }
    }

    /// Samples of one phase in arrival order.
    pub fn samples(&self, phase: CalibrationPhase) -> &[CalibrationSample] {
        match phase {
            CalibrationPhase::RoomAir => &self.room_air,
            CalibrationPhase::PureO2 => &self.pure_o2,
        }
    }

    pub fn clear(&mut self) {
        self.room_air.clear();
        self.pure_o2.clear();
    }

    pub fn summarize(&self) -> CalibrationSummary {
        CalibrationSummary {
            room_air: phase_result(&self.room_air),
            pure_o2: phase_result(&self.pure_o2),
        }
    }
}

/// Voltage min, max and median; `None` when the phase collected nothing.
pub fn phase_result(samples: &[CalibrationSample]) -> Option<CalibrationPhaseResult> {
    if samples.is_empty() {
        return None;
    }
    let voltages: Vec<f64> = samples.iter().map(|s| s.voltage).collect();
    Some(CalibrationPhaseResult {
        min: voltages.iter().copied().fold(f64::INFINITY, f64::min),
        max: voltages.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        median: statistics::median(&voltages),
        samples: voltages.len(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub room_air: Option<CalibrationPhaseResult>,
    pub pure_o2: Option<CalibrationPhaseResult>,
}

impl CalibrationSummary {
    pub fn get(&self, phase: CalibrationPhase) -> Option<&CalibrationPhaseResult> {
        match phase {
            CalibrationPhase::RoomAir => self.room_air.as_ref(),
            CalibrationPhase::PureO2 => self.pure_o2.as_ref(),
        }
    }

    /// Fixed-width voltage table, one row per phase.
    pub fn to_report_string(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<10} {:>10} {:>10} {:>10} {:>8}",
            "Segment", "Min V", "Max V", "Median V", "Samples"
        );
        for phase in CalibrationPhase::ALL {
            match self.get(phase) {
                Some(r) => {
                    let _ = writeln!(
                        out,
                        "{:<10} {:>10.3} {:>10.3} {:>10.3} {:>8}",
                        phase.label(),
                        r.min,
                        r.max,
                        r.median,
                        r.samples
                    );
                }
                None => {
                    let _ = writeln!(out, "{:<10} {:>10}", phase.label(), "no data");
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationEvent {
    PhaseStarted(CalibrationPhase),
    Sample {
        phase: CalibrationPhase,
        sample: CalibrationSample,
    },
    TransportGap(DeviceFault),
    Finished(CalibrationSummary),
}

/// Collects both calibration phases on a background thread.
///
/// Starts on construction. [`Self::stop`] cuts the current phase short and
/// skips the next one; [`Self::join`] hands the session back.
pub struct CalibrationRunner {
    handle: Option<JoinHandle<CalibrationSession>>,
    stop: Arc<AtomicBool>,
    events: Receiver<CalibrationEvent>,
}

impl CalibrationRunner {
    pub fn spawn<L: DeviceLink + 'static>(
        mut session: CalibrationSession,
        mut link: L,
        timing: CalibrationTiming,
        mut logger: Option<CalibrationLogger>,
    ) -> Self {
        let (tx, rx) = channel::unbounded();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            session.clear();
            for phase in CalibrationPhase::ALL {
                if stop_flag.load(Ordering::SeqCst) {
                    break;
                }
                collect_phase(
                    phase,
                    &mut session,
                    &mut link,
                    &timing,
                    logger.as_mut(),
                    &stop_flag,
                    &tx,
                );
            }
            let summary = session.summarize();
            info!(
                room_air = summary.room_air.map_or(0, |r| r.samples),
                pure_o2 = summary.pure_o2.map_or(0, |r| r.samples),
                "Calibration finished"
            );
            let _ = tx.send(CalibrationEvent::Finished(summary));
            session
        });

        Self {
            handle: Some(handle),
            stop,
            events: rx,
        }
    }

    pub fn events(&self) -> Receiver<CalibrationEvent> {
        self.events.clone()
    }

    /// Requests a cooperative stop; takes effect after the in-flight sample.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the worker and returns the recorded session.
    pub fn join(mut self) -> Result<CalibrationSession, Robd2Error> {
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Robd2Error::WorkerPanicked("calibration")),
            None => Err(Robd2Error::WorkerPanicked("calibration")),
        }
    }
}

impl Drop for CalibrationRunner {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn collect_phase<L: DeviceLink>(
    phase: CalibrationPhase,
    session: &mut CalibrationSession,
    link: &mut L,
    timing: &CalibrationTiming,
    mut logger: Option<&mut CalibrationLogger>,
    stop: &AtomicBool,
    events: &Sender<CalibrationEvent>,
) {
    info!(%phase, seconds = timing.phase_duration.as_secs_f64(), "Calibration phase started");
    let _ = events.send(CalibrationEvent::PhaseStarted(phase));

    let started = Instant::now();
    while started.elapsed() < timing.phase_duration && !stop.load(Ordering::SeqCst) {
        match device::read_calibration_sample(link, timing.response_timeout, timing.command_gap) {
            Ok(sample) => {
                session.record(phase, sample);
                if let Some(logger) = logger.as_deref_mut() {
                    if let Err(e) = logger.log_sample(phase, &sample, Local::now().naive_local()) {
                        warn!(error = %e, "failed to append calibration log row");
                    }
                }
                let _ = events.send(CalibrationEvent::Sample { phase, sample });
                thread::sleep(timing.sample_interval);
            }
            Err(fault) => {
                debug!(%fault, %phase, "no calibration sample this cycle");
                let _ = events.send(CalibrationEvent::TransportGap(fault));
                thread::sleep(timing.backoff);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(o2: f64, voltage: f64) -> CalibrationSample {
        CalibrationSample {
            o2_conc_pct: o2,
            voltage,
        }
    }

    #[test]
    fn records_into_the_right_phase() {
        let mut session = CalibrationSession::new(Some("9515".into()));
        session.record(CalibrationPhase::RoomAir, sample(20.9, 0.99));
        session.record(CalibrationPhase::PureO2, sample(99.5, 4.73));
        session.record(CalibrationPhase::PureO2, sample(99.6, 4.74));

        assert_eq!(session.samples(CalibrationPhase::RoomAir).len(), 1);
        assert_eq!(session.samples(CalibrationPhase::PureO2).len(), 2);
        assert_eq!(session.device_id(), Some("9515"));
    }

    #[test]
    fn summarizes_voltages_per_phase() {
        let mut session = CalibrationSession::new(None);
        for v in [1.02, 0.98, 1.00, 1.05] {
            session.record(CalibrationPhase::RoomAir, sample(20.9, v));
        }
        let summary = session.summarize();
        let room = summary.room_air.unwrap();
        assert_relative_eq!(room.min, 0.98);
        assert_relative_eq!(room.max, 1.05);
        assert_relative_eq!(room.median, 1.01, epsilon = 1e-12);
        assert_eq!(room.samples, 4);
        assert!(summary.pure_o2.is_none());
    }

    #[test]
    fn empty_phase_reports_no_data() {
        let summary = CalibrationSession::default().summarize();
        assert!(summary.get(CalibrationPhase::RoomAir).is_none());
        let table = summary.to_report_string();
        assert!(table.contains("Room Air"));
        assert!(table.contains("no data"));
    }
}
