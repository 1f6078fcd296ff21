use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-reading verdict surfaced to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Reading taken inside the post-transition settling window. Never aggregated.
    Stabilizing,
    Pass,
    Review,
    Error,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Stabilizing => "STABILIZING",
            Verdict::Pass => "PASS",
            Verdict::Review => "REVIEW",
            Verdict::Error => "ERROR",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilizationState {
    Stabilizing,
    Settled,
}

/// Instantaneous band check of a single raw O2 value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BandStatus {
    Passed,
    Review,
    NotPassed,
}

impl fmt::Display for BandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BandStatus::Passed => "PASSED",
            BandStatus::Review => "REVIEW",
            BandStatus::NotPassed => "NOT PASSED",
        })
    }
}

/// Overall accept/reject outcome of a finished performance test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionVerdict {
    Pass,
    Fail,
}

impl fmt::Display for SessionVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionVerdict::Pass => "PASS",
            SessionVerdict::Fail => "FAIL",
        })
    }
}
