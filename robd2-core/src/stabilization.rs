use crate::{constants::STABILIZATION_WINDOW, window::SlidingWindow};
use robd2_schemas::verdict::StabilizationState;
use std::time::{Duration, Instant};
use tracing::info;

/// Result of feeding one altitude to the tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub state: StabilizationState,
    /// True for the first reading and for every altitude change.
    pub transition: bool,
    /// Time left before readings at this altitude are scored.
    pub remaining: Duration,
}

/// Withholds scoring for a fixed settling period after each altitude change.
#[derive(Debug, Clone)]
pub struct StabilizationTracker {
    last_altitude: Option<i32>,
    altitude_change_time: Option<Instant>,
    settle_for: Duration,
}

impl StabilizationTracker {
    pub fn new(settle_for: Duration) -> Self {
        Self {
            last_altitude: None,
            altitude_change_time: None,
            settle_for,
        }
    }

    /// Classifies a reading at `altitude_ft` taken at `now`.
    ///
    /// An altitude change empties `window`: its samples belong to the previous altitude.
    pub fn observe(&mut self, altitude_ft: i32, now: Instant, window: &mut SlidingWindow) -> Observation {
        let transition = match self.last_altitude {
            None => true,
            Some(previous) if previous != altitude_ft => {
                info!(from = previous, to = altitude_ft, "altitude transition, window cleared");
                window.clear();
                true
            }
            Some(_) => false,
        };

        if transition {
            self.last_altitude = Some(altitude_ft);
            self.altitude_change_time = Some(now);
        }

        let elapsed = self
            .altitude_change_time
            .map_or(Duration::ZERO, |changed| now.saturating_duration_since(changed));

        if transition || elapsed < self.settle_for {
            Observation {
                state: StabilizationState::Stabilizing,
                transition,
                remaining: self.settle_for.saturating_sub(elapsed),
            }
        } else {
            Observation {
                state: StabilizationState::Settled,
                transition,
                remaining: Duration::ZERO,
            }
        }
    }

    pub fn last_altitude(&self) -> Option<i32> {
        self.last_altitude
    }

    pub fn altitude_change_time(&self) -> Option<Instant> {
        self.altitude_change_time
    }

    pub fn reset(&mut self) {
        self.last_altitude = None;
        self.altitude_change_time = None;
    }
}

impl Default for StabilizationTracker {
    fn default() -> Self {
        Self::new(STABILIZATION_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn first_reading_is_stabilizing() {
        let mut tracker = StabilizationTracker::default();
        let mut window = SlidingWindow::default();
        let obs = tracker.observe(0, Instant::now(), &mut window);
        assert_eq!(obs.state, StabilizationState::Stabilizing);
        assert!(obs.transition);
        assert_eq!(obs.remaining, STABILIZATION_WINDOW);
        assert_eq!(tracker.last_altitude(), Some(0));
    }

    #[test]
    fn settles_twenty_five_seconds_after_change() {
        let mut tracker = StabilizationTracker::default();
        let mut window = SlidingWindow::default();
        let t0 = Instant::now();

        tracker.observe(5000, t0, &mut window);
        let changed = tracker.observe(10_000, t0 + secs(1), &mut window);
        assert!(changed.transition);

        let early = tracker.observe(10_000, t0 + secs(24), &mut window);
        assert_eq!(early.state, StabilizationState::Stabilizing);
        assert_eq!(early.remaining, secs(2));

        let late = tracker.observe(10_000, t0 + secs(26), &mut window);
        assert_eq!(late.state, StabilizationState::Settled);
        assert!(!late.transition);
    }

    #[test]
    fn altitude_change_clears_window() {
        let mut tracker = StabilizationTracker::new(Duration::ZERO);
        let mut window = SlidingWindow::default();
        let t0 = Instant::now();

        tracker.observe(0, t0, &mut window);
        window.push(21.0);
        window.push(21.0);
        tracker.observe(0, t0 + secs(1), &mut window);
        assert_eq!(window.len(), 2);

        tracker.observe(5000, t0 + secs(2), &mut window);
        assert!(window.is_empty());
        assert_eq!(tracker.altitude_change_time(), Some(t0 + secs(2)));
    }

    #[test]
    fn transition_reading_is_never_settled_even_with_zero_window() {
        let mut tracker = StabilizationTracker::new(Duration::ZERO);
        let mut window = SlidingWindow::default();
        let t0 = Instant::now();
        assert_eq!(tracker.observe(0, t0, &mut window).state, StabilizationState::Stabilizing);
        assert_eq!(tracker.observe(0, t0, &mut window).state, StabilizationState::Settled);
    }
}
