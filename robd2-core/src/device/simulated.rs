use super::DeviceLink;
use std::{collections::VecDeque, time::Duration};

/// One leg of a simulated altitude profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileStep {
    pub altitude_ft: i32,
    pub o2_pct: f64,
    /// Number of `GET RUN ALL` frames served at this altitude.
    pub repetitions: usize,
}

impl ProfileStep {
    pub fn new(altitude_ft: i32, o2_pct: f64, repetitions: usize) -> Self {
        Self {
            altitude_ft,
            o2_pct,
            repetitions,
        }
    }
}

/// In-process stand-in for a ROBD2 that replays an altitude profile.
///
/// Each `GET RUN ALL` (or `GET RUN O2CONC`) advances the profile by one frame;
/// once exhausted the last step repeats forever. Responses are deterministic,
/// with a small periodic jitter on the O2 value.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    steps: Vec<ProfileStep>,
    frame: usize,
    current: ProfileStep,
    pending: VecDeque<String>,
    silent_frames: usize,
    jitter: f64,
    program_id: u32,
    info: String,
}

impl SimulatedDevice {
    pub fn new(steps: Vec<ProfileStep>) -> Self {
        let current = steps
            .first()
            .copied()
            .unwrap_or(ProfileStep::new(0, 20.95, 1));
        Self {
            steps,
            frame: 0,
            current,
            pending: VecDeque::new(),
            silent_frames: 0,
            jitter: 0.02,
            program_id: 1,
            info: "ROBD2 SIMULATOR 1.0".to_string(),
        }
    }

    /// A short hypoxia-training profile: ground, 10,000 ft, 25,000 ft, ground.
    pub fn training_profile() -> Self {
        Self::new(vec![
            ProfileStep::new(0, 20.98, 10),
            ProfileStep::new(10_000, 14.07, 60),
            ProfileStep::new(25_000, 6.90, 60),
            ProfileStep::new(0, 20.98, 10),
        ])
    }

    /// Constant room-air then pure-O2 readings, for calibration runs.
    pub fn calibration_profile(room_air_frames: usize) -> Self {
        Self::new(vec![
            ProfileStep::new(0, 20.93, room_air_frames),
            ProfileStep::new(0, 99.60, 1),
        ])
    }

    /// Leaves the first `frames` sampling requests unanswered.
    pub fn with_silent_frames(mut self, frames: usize) -> Self {
        self.silent_frames = frames;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    fn advance(&mut self) -> ProfileStep {
        let mut remaining = self.frame;
        let mut step = self.steps.last().copied().unwrap_or(self.current);
        for candidate in &self.steps {
            if remaining < candidate.repetitions {
                step = *candidate;
                break;
            }
            remaining -= candidate.repetitions;
        }
        self.frame += 1;
        self.current = step;
        step
    }

    fn o2_now(&self) -> f64 {
        self.current.o2_pct + self.jitter * (self.frame as f64 * 0.7).sin()
    }

    fn sensor_voltage(o2_pct: f64) -> f64 {
        0.0476 * o2_pct
    }

    fn respond(&mut self, command: &str) -> bool {
        match command {
            "GET RUN ALL" | "GET RUN O2CONC" if self.silent_frames > 0 => {
                self.silent_frames -= 1;
                true
            }
            "GET RUN ALL" => {
                let step = self.advance();
                let seconds = self.frame;
                let line = format!(
                    "01-01-24 00-{:02}-{:02},{},{},{},{:.2},1.10,{},{},97,74",
                    (seconds / 60) % 60,
                    seconds % 60,
                    self.program_id,
                    step.altitude_ft,
                    step.altitude_ft,
                    self.o2_now(),
                    seconds,
                    self.total_frames().saturating_sub(seconds),
                );
                self.pending.push_back(line);
                true
            }
            "GET RUN O2CONC" => {
                self.advance();
                let line = format!("{:.2}", self.o2_now());
                self.pending.push_back(line);
                true
            }
            "GET ADC 1" => {
                let line = format!("{:.3}", Self::sensor_voltage(self.o2_now()) * 1.02);
                self.pending.push_back(line);
                true
            }
            "GET ADC 12" => {
                let line = format!("{:.3}", Self::sensor_voltage(self.o2_now()));
                self.pending.push_back(line);
                true
            }
            "GET INFO" => {
                self.pending.push_back(self.info.clone());
                true
            }
            _ => false,
        }
    }

    fn total_frames(&self) -> usize {
        self.steps.iter().map(|s| s.repetitions).sum()
    }
}

impl DeviceLink for SimulatedDevice {
    fn send(&mut self, command: &str) -> bool {
        self.respond(command.trim())
    }

    fn read_line(&mut self, _timeout: Duration) -> Option<String> {
        self.pending.pop_front()
    }
}
