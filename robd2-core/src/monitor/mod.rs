//! Performance monitoring: per-reading orchestration, configuration and the
//! background ingestion loop.

pub mod builder;
pub mod runner;
pub mod session;

pub use builder::MonitorBuilder;
pub use runner::{MonitorEvent, MonitorRunner};
pub use session::MonitoringSession;

use crate::results::FinalReport;
use robd2_schemas::{
    altitude::AltitudeSpec,
    reading::Reading,
    stats::StatSnapshot,
    verdict::{BandStatus, StabilizationState, Verdict},
};
use std::time::Duration;

/// What the engine concluded about one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingOutcome {
    pub reading: Reading,
    pub state: StabilizationState,
    /// Zero once settled.
    pub stabilization_remaining: Duration,
    /// `None` when no specification covers the altitude; the reading is unscored.
    pub spec: Option<AltitudeSpec>,
    pub stats: Option<StatSnapshot>,
    /// Mean of the window after this reading was added.
    pub window_mean: f64,
    /// `Stabilizing` inside the settling window, `None` when unscored.
    pub verdict: Option<Verdict>,
    pub band: Option<BandStatus>,
    /// Set on the reading that ended the test.
    pub completed: Option<FinalReport>,
}

impl ReadingOutcome {
    /// True when the reading was aggregated into the altitude results.
    pub fn is_scored(&self) -> bool {
        matches!(
            self.verdict,
            Some(Verdict::Pass) | Some(Verdict::Review) | Some(Verdict::Error)
        )
    }
}
