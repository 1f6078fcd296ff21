use super::{runner::MonitorRunner, session::MonitoringSession};
use crate::{
    constants::{MonitorTiming, WINDOW_CAPACITY},
    device::DeviceLink,
    error::Robd2Error,
    logger::PerformanceLogger,
    results::AltitudeResults,
    spec_table::SpecificationTable,
    stabilization::StabilizationTracker,
    window::SlidingWindow,
};
use std::path::PathBuf;

/// A fluent builder for a [`MonitoringSession`] or a [`MonitorRunner`].
///
/// Every setting has a default: the reference specification table, a
/// 12-reading window and the standard timing.
#[derive(Default)]
pub struct MonitorBuilder {
    spec_table: Option<SpecificationTable>,
    window_capacity: Option<usize>,
    timing: Option<MonitorTiming>,
    device_id: Option<String>,
    log_path: Option<PathBuf>,
}

impl MonitorBuilder {
    /// Creates a builder with every setting at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the reference specification table.
    pub fn with_spec_table(mut self, table: SpecificationTable) -> Self {
        self.spec_table = Some(table);
        self
    }

    /// Sets how many recent readings the statistics are computed over.
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = Some(capacity);
        self
    }

    /// Overrides the stabilization window and the sampling cadence.
    pub fn with_timing(mut self, timing: MonitorTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Device identifier carried into the final report.
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Writes one CSV row per specified reading. Only used by [`Self::build_runner`].
    pub fn with_performance_log_to_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Builds a session that is driven by calling
    /// [`MonitoringSession::on_reading`] directly.
    ///
    /// # Errors
    ///
    /// Returns [`Robd2Error::ConfigError`] for a zero window capacity or a
    /// zero stabilization window.
    pub fn build(self) -> Result<MonitoringSession, Robd2Error> {
        self.build_parts().map(|(session, _)| session)
    }

    /// Builds a runner that samples `link` on a background thread.
    ///
    /// # Errors
    ///
    /// As [`Self::build`], plus any failure to create the CSV log.
    pub fn build_runner<L: DeviceLink + 'static>(self, link: L) -> Result<MonitorRunner<L>, Robd2Error> {
        let (session, log_path) = self.build_parts()?;
        let logger = match log_path {
            Some(path) => Some(PerformanceLogger::new(path)?),
            None => None,
        };
        Ok(MonitorRunner::new(session, link, logger))
    }

    fn build_parts(self) -> Result<(MonitoringSession, Option<PathBuf>), Robd2Error> {
        let window = SlidingWindow::new(self.window_capacity.unwrap_or(WINDOW_CAPACITY))?;
        let timing = self.timing.unwrap_or_default();
        if timing.stabilization.is_zero() {
            return Err(Robd2Error::ConfigError(
                "stabilization window must be longer than zero".to_string(),
            ));
        }

        let session = MonitoringSession {
            spec_table: self.spec_table.unwrap_or_default(),
            tracker: StabilizationTracker::new(timing.stabilization),
            window,
            results: AltitudeResults::new(),
            timing,
            device_id: self.device_id,
            running: false,
            final_report: None,
        };
        Ok((session, self.log_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedDevice;
    use std::time::Duration;

    #[test]
    fn defaults_use_reference_table() {
        let session = MonitorBuilder::new().build().unwrap();
        assert_eq!(session.spec_table().len(), 12);
        assert_eq!(session.window().capacity(), WINDOW_CAPACITY);
        assert_eq!(session.timing(), &MonitorTiming::default());
        assert!(!session.is_running());
    }

    #[test]
    fn rejects_zero_window() {
        let result = MonitorBuilder::new().with_window_capacity(0).build();
        assert!(matches!(result, Err(Robd2Error::ConfigError(_))));
    }

    #[test]
    fn rejects_zero_stabilization() {
        let timing = MonitorTiming {
            stabilization: Duration::ZERO,
            ..MonitorTiming::default()
        };
        let result = MonitorBuilder::new().with_timing(timing).build();
        assert!(matches!(result, Err(Robd2Error::ConfigError(_))));
    }

    #[test]
    fn runner_creates_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.csv");
        let runner = MonitorBuilder::new()
            .with_device_id("9515")
            .with_performance_log_to_file(&path)
            .build_runner(SimulatedDevice::training_profile())
            .unwrap();
        assert!(!runner.is_running());
        assert!(path.exists());
    }
}
