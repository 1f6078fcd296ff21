//! Device-link boundary.
//!
//! The transport itself lives outside this crate; everything here talks to a
//! [`DeviceLink`] and turns its raw response lines into typed values. Lines
//! that do not decode never reach the monitoring engine.

mod simulated;

pub use simulated::{ProfileStep, SimulatedDevice};

use chrono::Local;
use robd2_schemas::{calibration::CalibrationSample, command::DeviceCommand, reading::Reading};
use std::{thread, time::Duration};
use thiserror::Error;

/// Line-oriented command/response channel to a ROBD2.
pub trait DeviceLink: Send {
    /// Writes one command line. Returns false if the write failed.
    fn send(&mut self, command: &str) -> bool;

    /// Next decoded response line, or `None` on timeout or decode failure.
    fn read_line(&mut self, timeout: Duration) -> Option<String>;
}

impl<L: DeviceLink + ?Sized> DeviceLink for Box<L> {
    fn send(&mut self, command: &str) -> bool {
        (**self).send(command)
    }

    fn read_line(&mut self, timeout: Duration) -> Option<String> {
        (**self).read_line(timeout)
    }
}

/// A sampling cycle that produced no usable data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceFault {
    #[error("device did not accept '{0}'")]
    SendFailed(DeviceCommand),

    #[error("no response to '{0}'")]
    NoResponse(DeviceCommand),

    #[error("malformed response to '{command}': {line:?}")]
    Malformed { command: DeviceCommand, line: String },
}

/// Decoded `GET RUN ALL` response.
#[derive(Debug, Clone, PartialEq)]
pub struct RunAllFrame {
    pub timestamp: String,
    pub program: String,
    pub current_altitude_ft: i32,
    pub final_altitude: String,
    pub o2_conc_pct: f64,
    pub breathing_loop_pressure: f64,
    pub elapsed_time: String,
    pub remaining_time: String,
    pub spo2: Option<f64>,
    pub pulse: Option<f64>,
}

pub const RUN_ALL_FIELDS: usize = 10;

/// Parses `timestamp,program#,current_alt,final_alt,o2conc,blp,elapsed,remaining,spo2,pulse`.
///
/// Exactly ten fields are required. The altitude may be reported with a
/// fractional part and is truncated to whole feet.
pub fn parse_run_all(line: &str) -> Option<RunAllFrame> {
    let parts: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    if parts.len() != RUN_ALL_FIELDS {
        return None;
    }

    let altitude: f64 = parts[2].parse().ok()?;
    if !altitude.is_finite() {
        return None;
    }

    Some(RunAllFrame {
        timestamp: parts[0].to_string(),
        program: parts[1].to_string(),
        current_altitude_ft: altitude.trunc() as i32,
        final_altitude: parts[3].to_string(),
        o2_conc_pct: parse_number(parts[4])?,
        breathing_loop_pressure: parse_number(parts[5])?,
        elapsed_time: parts[6].to_string(),
        remaining_time: parts[7].to_string(),
        spo2: parse_number(parts[8]),
        pulse: parse_number(parts[9]),
    })
}

/// Single finite floating-point response such as `GET ADC 12`.
pub fn parse_number(line: &str) -> Option<f64> {
    line.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Sends `command` and waits for its response line.
pub fn query<L: DeviceLink + ?Sized>(
    link: &mut L,
    command: DeviceCommand,
    timeout: Duration,
) -> Result<String, DeviceFault> {
    if !link.send(&command.to_string()) {
        return Err(DeviceFault::SendFailed(command));
    }
    link.read_line(timeout).ok_or(DeviceFault::NoResponse(command))
}

fn query_number<L: DeviceLink + ?Sized>(
    link: &mut L,
    command: DeviceCommand,
    timeout: Duration,
) -> Result<f64, DeviceFault> {
    let line = query(link, command, timeout)?;
    parse_number(&line).ok_or(DeviceFault::Malformed { command, line })
}

/// One full monitoring sample: `GET RUN ALL`, `GET ADC 1`, `GET ADC 12`.
pub fn read_reading<L: DeviceLink + ?Sized>(
    link: &mut L,
    response_timeout: Duration,
    command_gap: Duration,
) -> Result<Reading, DeviceFault> {
    let line = query(link, DeviceCommand::GetRunAll, response_timeout)?;
    let frame = parse_run_all(&line).ok_or(DeviceFault::Malformed {
        command: DeviceCommand::GetRunAll,
        line,
    })?;

    pause(command_gap);
    let voltage_primary = query_number(link, DeviceCommand::ADC_PRIMARY, response_timeout)?;
    pause(command_gap);
    let voltage_secondary = query_number(link, DeviceCommand::ADC_REFERENCE, response_timeout)?;

    Ok(Reading {
        timestamp: Local::now().naive_local(),
        device_timestamp: frame.timestamp,
        altitude_ft: frame.current_altitude_ft,
        o2_conc_pct: frame.o2_conc_pct,
        voltage_primary,
        voltage_secondary,
        breathing_loop_pressure: frame.breathing_loop_pressure,
        program_id: frame.program,
        final_altitude: frame.final_altitude,
        elapsed_time: frame.elapsed_time,
        remaining_time: frame.remaining_time,
        spo2: frame.spo2,
        pulse: frame.pulse,
    })
}

/// One calibration sample: `GET RUN O2CONC`, then `GET ADC 12`.
pub fn read_calibration_sample<L: DeviceLink + ?Sized>(
    link: &mut L,
    response_timeout: Duration,
    command_gap: Duration,
) -> Result<CalibrationSample, DeviceFault> {
    let o2_conc_pct = query_number(link, DeviceCommand::GetRunO2Conc, response_timeout)?;
    pause(command_gap);
    let voltage = query_number(link, DeviceCommand::ADC_REFERENCE, response_timeout)?;
    Ok(CalibrationSample { o2_conc_pct, voltage })
}

/// Device identification string, `"Unknown"` when the device stays silent.
pub fn query_info<L: DeviceLink + ?Sized>(link: &mut L, response_timeout: Duration) -> String {
    match query(link, DeviceCommand::GetInfo, response_timeout) {
        Ok(line) if !line.trim().is_empty() => line.trim().to_string(),
        _ => "Unknown".to_string(),
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}
