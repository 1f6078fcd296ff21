use crate::{error::Robd2Error, monitor::ReadingOutcome};
use chrono::NaiveDateTime;
use csv::{Writer, WriterBuilder};
use robd2_schemas::{
    calibration::{CalibrationPhase, CalibrationSample},
    verdict::Verdict,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const PERFORMANCE_LOG_HEADERS: [&str; 21] = [
    "Timestamp",
    "Altitude(ft)",
    "Desired O2%",
    "Actual O2%",
    "O2 Error%",
    "Sensor V1",
    "Sensor V12",
    "BLP",
    "Min Range%",
    "Max Range%",
    "Program",
    "Final Altitude",
    "Elapsed Time",
    "Remaining Time",
    "Verdict",
    "Median O2%",
    "StdDev",
    "CV%",
    "SEM",
    "Stability%",
    "Drift%",
];

pub const CALIBRATION_LOG_HEADERS: [&str; 6] = [
    "Device ID",
    "Device Info",
    "Timestamp",
    "O2 %",
    "ADC12 Voltage",
    "Segment",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `<dir>/ROBD2_<device>_<YYYYmmdd_HHMMSS>.csv`
pub fn log_file_path(dir: &Path, device_id: &str, started: NaiveDateTime) -> PathBuf {
    dir.join(format!("ROBD2_{}_{}.csv", device_id, started.format("%Y%m%d_%H%M%S")))
}

#[derive(Debug, Serialize)]
struct PerformanceLogEntry {
    timestamp: String,
    altitude_ft: i32,
    desired_o2: String,
    actual_o2: String,
    o2_error: String,
    sensor_v1: String,
    sensor_v12: String,
    blp: String,
    range_min: String,
    range_max: String,
    program: String,
    final_altitude: String,
    elapsed_time: String,
    remaining_time: String,
    verdict: String,
    median_o2: String,
    std_dev: String,
    cv_pct: String,
    sem: String,
    stability_pct: String,
    drift: String,
}

/// One row of a performance log, as read back for analysis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PerformanceLogRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Altitude(ft)")]
    pub altitude_ft: i32,
    #[serde(rename = "Desired O2%")]
    pub desired_o2: f64,
    #[serde(rename = "Actual O2%")]
    pub actual_o2: f64,
    #[serde(rename = "O2 Error%")]
    pub o2_error: f64,
    #[serde(rename = "Sensor V1")]
    pub sensor_v1: f64,
    #[serde(rename = "Sensor V12")]
    pub sensor_v12: f64,
    #[serde(rename = "BLP")]
    pub blp: f64,
    #[serde(rename = "Min Range%")]
    pub range_min: f64,
    #[serde(rename = "Max Range%")]
    pub range_max: f64,
    #[serde(rename = "Program")]
    pub program: String,
    #[serde(rename = "Final Altitude")]
    pub final_altitude: String,
    #[serde(rename = "Elapsed Time")]
    pub elapsed_time: String,
    #[serde(rename = "Remaining Time")]
    pub remaining_time: String,
    #[serde(rename = "Verdict")]
    pub verdict: Verdict,
    #[serde(rename = "Median O2%")]
    pub median_o2: f64,
    #[serde(rename = "StdDev")]
    pub std_dev: f64,
    #[serde(rename = "CV%")]
    pub cv_pct: f64,
    #[serde(rename = "SEM")]
    pub sem: f64,
    #[serde(rename = "Stability%")]
    pub stability_pct: f64,
    #[serde(rename = "Drift%")]
    pub drift: f64,
}

/// Appends one CSV row per spec-matched reading.
pub struct PerformanceLogger {
    path: PathBuf,
    writer: Writer<fs::File>,
}

impl PerformanceLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Robd2Error> {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Robd2Error::FileIO(display.clone(), e))?;
        }
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        writer
            .write_record(PERFORMANCE_LOG_HEADERS)
            .map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        writer.flush().map_err(|e| Robd2Error::FileIO(display, e))?;
        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the outcome if it matched a spec; unscored readings are skipped.
    pub fn log_outcome(&mut self, outcome: &ReadingOutcome) -> Result<(), Robd2Error> {
        let Some(spec) = outcome.spec else {
            return Ok(());
        };
        let reading = &outcome.reading;
        let verdict = outcome.verdict.unwrap_or(Verdict::Stabilizing);
        let stats = outcome.stats.unwrap_or_default();
        // Actual, error and median all describe the window, not the raw sample.
        let (actual, error, median) = match outcome.stats {
            Some(s) => (s.mean, s.error, s.median),
            None => (
                outcome.window_mean,
                outcome.window_mean - spec.desired_o2_pct,
                outcome.window_mean,
            ),
        };

        let entry = PerformanceLogEntry {
            timestamp: reading.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            altitude_ft: reading.altitude_ft,
            desired_o2: format!("{:.2}", spec.desired_o2_pct),
            actual_o2: format!("{:.2}", actual),
            o2_error: format!("{:.2}", error),
            sensor_v1: format!("{:.3}", reading.voltage_primary),
            sensor_v12: format!("{:.3}", reading.voltage_secondary),
            blp: format!("{:.2}", reading.breathing_loop_pressure),
            range_min: format!("{:.2}", spec.range_min),
            range_max: format!("{:.2}", spec.range_max),
            program: reading.program_id.clone(),
            final_altitude: reading.final_altitude.clone(),
            elapsed_time: reading.elapsed_time.clone(),
            remaining_time: reading.remaining_time.clone(),
            verdict: verdict.to_string(),
            median_o2: format!("{:.2}", median),
            std_dev: format!("{:.3}", stats.std_dev),
            cv_pct: format!("{:.2}", stats.cv_pct),
            sem: format!("{:.3}", stats.sem),
            stability_pct: format!("{:.1}", stats.stability_pct),
            drift: format!("{:.3}", stats.drift),
        };

        let display = self.path.display().to_string();
        self.writer
            .serialize(entry)
            .map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        self.writer.flush().map_err(|e| Robd2Error::FileIO(display, e))?;
        Ok(())
    }
}

pub fn read_performance_log<P: AsRef<Path>>(path: P) -> Result<Vec<PerformanceLogRecord>, Robd2Error> {
    let display = path.as_ref().display().to_string();
    let mut reader =
        csv::Reader::from_path(path.as_ref()).map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: PerformanceLogRecord = result.map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        records.push(record);
    }
    Ok(records)
}

#[derive(Debug, Serialize)]
struct CalibrationLogEntry<'a> {
    device_id: &'a str,
    device_info: &'a str,
    timestamp: String,
    o2_pct: String,
    voltage: String,
    segment: &'a str,
}

/// Raw calibration samples, one row each, tagged with their segment.
pub struct CalibrationLogger {
    path: PathBuf,
    device_id: String,
    writer: Writer<fs::File>,
}

impl CalibrationLogger {
    /// Creates the file and writes the header plus a device-info preamble row.
    pub fn new<P: AsRef<Path>>(path: P, device_id: &str, device_info: &str) -> Result<Self, Robd2Error> {
        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Robd2Error::FileIO(display.clone(), e))?;
        }
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)
            .map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        writer
            .write_record(CALIBRATION_LOG_HEADERS)
            .map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        writer
            .write_record([device_id, device_info, "", "", "", ""])
            .map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        writer.flush().map_err(|e| Robd2Error::FileIO(display, e))?;
        Ok(Self {
            path,
            device_id: device_id.to_string(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_sample(
        &mut self,
        phase: CalibrationPhase,
        sample: &CalibrationSample,
        at: NaiveDateTime,
    ) -> Result<(), Robd2Error> {
        let entry = CalibrationLogEntry {
            device_id: &self.device_id,
            device_info: "",
            timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
            o2_pct: format!("{:.2}", sample.o2_conc_pct),
            voltage: format!("{:.3}", sample.voltage),
            segment: phase.label(),
        };
        let display = self.path.display().to_string();
        self.writer
            .serialize(entry)
            .map_err(|e| Robd2Error::CsvError(display.clone(), e))?;
        self.writer.flush().map_err(|e| Robd2Error::FileIO(display, e))?;
        Ok(())
    }
}
