use crate::{constants::MIN_PASSES_PER_ALTITUDE, error::Robd2Error};
use chrono::NaiveDateTime;
use robd2_schemas::{
    stats::StatSnapshot,
    verdict::{SessionVerdict, Verdict},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// Verdict tally for one altitude across a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AltitudeOutcome {
    pub passes: u32,
    pub total_readings: u32,
    pub stat_history: Vec<StatSnapshot>,
    pub completed: bool,
}

impl AltitudeOutcome {
    /// Field-wise mean of the recorded snapshots.
    pub fn average_stats(&self) -> Option<StatSnapshot> {
        if self.stat_history.is_empty() {
            return None;
        }
        let n = self.stat_history.len() as f64;
        let sum = self.stat_history.iter().fold(StatSnapshot::default(), |acc, s| StatSnapshot {
            mean: acc.mean + s.mean,
            median: acc.median + s.median,
            std_dev: acc.std_dev + s.std_dev,
            error: acc.error + s.error,
            cv_pct: acc.cv_pct + s.cv_pct,
            sem: acc.sem + s.sem,
            stability_pct: acc.stability_pct + s.stability_pct,
            drift: acc.drift + s.drift,
        });
        Some(StatSnapshot {
            mean: sum.mean / n,
            median: sum.median / n,
            std_dev: sum.std_dev / n,
            error: sum.error / n,
            cv_pct: sum.cv_pct / n,
            sem: sum.sem / n,
            stability_pct: sum.stability_pct / n,
            drift: sum.drift / n,
        })
    }
}

/// Per-altitude outcomes, created lazily the first time an altitude is scored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AltitudeResults {
    outcomes: BTreeMap<i32, AltitudeOutcome>,
}

impl AltitudeResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one scored reading. Only `PASS` counts toward `passes`.
    pub fn record(&mut self, altitude_ft: i32, verdict: Verdict, snapshot: Option<StatSnapshot>) {
        let outcome = self.outcomes.entry(altitude_ft).or_default();
        outcome.total_readings += 1;
        if verdict == Verdict::Pass {
            outcome.passes += 1;
        }
        if let Some(snapshot) = snapshot {
            outcome.stat_history.push(snapshot);
        }
        outcome.completed = true;
    }

    pub fn get(&self, altitude_ft: i32) -> Option<&AltitudeOutcome> {
        self.outcomes.get(&altitude_ft)
    }

    /// Ascending by altitude.
    pub fn iter(&self) -> impl Iterator<Item = (&i32, &AltitudeOutcome)> {
        self.outcomes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn any_completed_above(&self, altitude_ft: i32) -> bool {
        self.outcomes
            .range(altitude_ft.saturating_add(1)..)
            .any(|(_, outcome)| outcome.completed)
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }

    pub fn final_report(&self, device_id: Option<String>, generated_at: NaiveDateTime) -> FinalReport {
        let altitudes: Vec<AltitudeReport> = self
            .outcomes
            .iter()
            .rev()
            .filter(|(_, outcome)| outcome.total_readings > 0)
            .map(|(&altitude_ft, outcome)| AltitudeReport {
                altitude_ft,
                passes: outcome.passes,
                total_readings: outcome.total_readings,
                altitude_pass: outcome.passes >= MIN_PASSES_PER_ALTITUDE,
                average_stats: outcome.average_stats(),
            })
            .collect();

        let verdict = if !altitudes.is_empty() && altitudes.iter().all(|a| a.altitude_pass) {
            SessionVerdict::Pass
        } else {
            SessionVerdict::Fail
        };

        FinalReport {
            device_id,
            generated_at,
            altitudes,
            verdict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AltitudeReport {
    pub altitude_ft: i32,
    pub passes: u32,
    pub total_readings: u32,
    pub altitude_pass: bool,
    pub average_stats: Option<StatSnapshot>,
}

/// End-of-session accept/reject summary. Altitudes are listed highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub device_id: Option<String>,
    pub generated_at: NaiveDateTime,
    pub altitudes: Vec<AltitudeReport>,
    pub verdict: SessionVerdict,
}

impl FinalReport {
    pub fn altitude(&self, altitude_ft: i32) -> Option<&AltitudeReport> {
        self.altitudes.iter().find(|a| a.altitude_ft == altitude_ft)
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Robd2Error> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)
            .map_err(|e| Robd2Error::FileIO(path.as_ref().display().to_string(), e))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, Robd2Error> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Robd2Error::FileIO(path.as_ref().display().to_string(), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Human-readable results table.
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();

        match &self.device_id {
            Some(id) => report.push_str(&format!("ROBD2-{} Performance Test Results\n", id)),
            None => report.push_str("ROBD2 Performance Test Results\n"),
        }
        report.push_str(&format!("Generated: {}\n", self.generated_at.format("%Y-%m-%d %H:%M:%S")));
        report.push_str(&"-".repeat(80));
        report.push('\n');

        report.push_str(&format!(
            "{:>13} | {:>6} | {:>14} | {:<6}\n",
            "Altitude (ft)", "Passes", "Total Readings", "Status"
        ));
        for alt in &self.altitudes {
            report.push_str(&format!(
                "{:>13} | {:>6} | {:>14} | {:<6}\n",
                alt.altitude_ft,
                alt.passes,
                alt.total_readings,
                if alt.altitude_pass { "PASS" } else { "FAIL" }
            ));
        }

        report.push_str("\nStatistical Analysis by Altitude\n");
        for alt in &self.altitudes {
            if let Some(stats) = &alt.average_stats {
                report.push_str(&format!(
                    "  {} ft: Median O2: {:.2}% | StdDev: {:.3} | CV: {:.2}% | SEM: {:.3} | Stability: {:.1}% | Drift: {:.3}%\n",
                    alt.altitude_ft,
                    stats.median,
                    stats.std_dev,
                    stats.cv_pct,
                    stats.sem,
                    stats.stability_pct,
                    stats.drift
                ));
            }
        }

        report.push_str(&"-".repeat(80));
        report.push('\n');
        match self.verdict {
            SessionVerdict::Pass => report.push_str("TEST PASSED - ROBD2 SAFE TO USE\n"),
            SessionVerdict::Fail => report.push_str("TEST FAILED - ROBD2 NEEDS REVIEW\n"),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn snapshot(median: f64, drift: f64) -> StatSnapshot {
        StatSnapshot {
            median,
            drift,
            ..StatSnapshot::default()
        }
    }

    fn generated_at() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn only_pass_increments_passes() {
        let mut results = AltitudeResults::new();
        results.record(10_000, Verdict::Pass, Some(snapshot(14.0, 0.0)));
        results.record(10_000, Verdict::Review, Some(snapshot(14.5, 0.1)));
        results.record(10_000, Verdict::Error, None);

        let outcome = results.get(10_000).unwrap();
        assert_eq!(outcome.passes, 1);
        assert_eq!(outcome.total_readings, 3);
        assert_eq!(outcome.stat_history.len(), 2);
        assert!(outcome.completed);
    }

    #[test]
    fn completion_requires_altitude_above_ground() {
        let mut results = AltitudeResults::new();
        results.record(0, Verdict::Pass, None);
        assert!(!results.any_completed_above(0));
        results.record(5000, Verdict::Review, None);
        assert!(results.any_completed_above(0));
    }

    #[test]
    fn averages_snapshot_history() {
        let mut results = AltitudeResults::new();
        results.record(25_000, Verdict::Pass, Some(snapshot(6.8, 0.2)));
        results.record(25_000, Verdict::Pass, Some(snapshot(7.0, 0.0)));
        let avg = results.get(25_000).unwrap().average_stats().unwrap();
        assert_abs_diff_eq!(avg.median, 6.9, epsilon = 1e-9);
        assert_abs_diff_eq!(avg.drift, 0.1, epsilon = 1e-9);
    }

    #[test]
    fn report_is_descending_and_requires_three_passes() {
        let mut results = AltitudeResults::new();
        for _ in 0..3 {
            results.record(10_000, Verdict::Pass, Some(snapshot(14.0, 0.0)));
        }
        for _ in 0..2 {
            results.record(25_000, Verdict::Pass, Some(snapshot(6.9, 0.0)));
        }

        let report = results.final_report(Some("9515".to_string()), generated_at());
        let order: Vec<i32> = report.altitudes.iter().map(|a| a.altitude_ft).collect();
        assert_eq!(order, vec![25_000, 10_000]);
        assert!(report.altitude(10_000).unwrap().altitude_pass);
        assert!(!report.altitude(25_000).unwrap().altitude_pass);
        assert_eq!(report.verdict, SessionVerdict::Fail);

        let text = report.to_report_string();
        assert!(text.contains("ROBD2-9515"));
        assert!(text.contains("TEST FAILED"));
    }

    #[test]
    fn all_altitudes_passing_is_session_pass() {
        let mut results = AltitudeResults::new();
        for _ in 0..4 {
            results.record(18_000, Verdict::Pass, None);
        }
        let report = results.final_report(None, generated_at());
        assert_eq!(report.verdict, SessionVerdict::Pass);
        assert!(report.to_report_string().contains("TEST PASSED"));
    }

    #[test]
    fn empty_results_fail() {
        let report = AltitudeResults::new().final_report(None, generated_at());
        assert!(report.altitudes.is_empty());
        assert_eq!(report.verdict, SessionVerdict::Fail);
    }

    #[test]
    fn report_serializes_to_json() {
        let mut results = AltitudeResults::new();
        results.record(5000, Verdict::Pass, Some(snapshot(17.2, 0.0)));
        let report = results.final_report(Some("9471".to_string()), generated_at());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"verdict\":\"FAIL\""));
        let back: FinalReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn report_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut results = AltitudeResults::new();
        for _ in 0..3 {
            results.record(25_000, Verdict::Pass, Some(snapshot(6.9, 0.0)));
        }
        let report = results.final_report(Some("9515".to_string()), generated_at());
        report.write_json(&path).unwrap();
        assert_eq!(FinalReport::from_json_file(&path).unwrap(), report);

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FinalReport::from_json_file(&path),
            Err(Robd2Error::JsonParsing(_))
        ));
    }
}
