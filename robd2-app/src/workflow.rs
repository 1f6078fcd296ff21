use crate::config::AppConfig;
use anyhow::{bail, Context, Result};
use chrono::Local;
use robd2_core::{
    calibration::{CalibrationEvent, CalibrationRunner, CalibrationSession, CalibrationSummary},
    constants::{CalibrationTiming, MonitorTiming},
    device::{self, DeviceLink},
    logger::{log_file_path, CalibrationLogger},
    monitor::{MonitorBuilder, MonitorEvent, ReadingOutcome},
    results::FinalReport,
    spec_table::SpecificationTable,
};
use robd2_schemas::{calibration::CalibrationPhase, verdict::StabilizationState};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{debug, info};

const STATUS_INTERVAL: Duration = Duration::from_secs(5);
const EVENT_POLL: Duration = Duration::from_millis(250);

/// Compressed timing for the simulated device, whose profile advances one
/// altitude frame per sample.
pub fn demo_monitor_timing() -> MonitorTiming {
    MonitorTiming {
        stabilization: Duration::from_secs(2),
        sample_interval: Duration::from_millis(50),
        backoff: Duration::from_millis(50),
        response_timeout: Duration::from_millis(100),
        command_gap: Duration::ZERO,
    }
}

pub fn demo_calibration_timing() -> CalibrationTiming {
    CalibrationTiming {
        phase_duration: Duration::from_secs(2),
        sample_interval: Duration::from_millis(50),
        backoff: Duration::from_millis(50),
        response_timeout: Duration::from_millis(100),
        command_gap: Duration::ZERO,
    }
}

pub fn print_specs(table: &SpecificationTable) {
    println!("{:>13} | {:>10} | {:>9} | {:>9}", "Altitude (ft)", "Desired O2", "Min O2", "Max O2");
    println!("{}", "-".repeat(50));
    for spec in table.iter() {
        println!(
            "{:>13} | {:>9.2}% | {:>8.2}% | {:>8.2}%",
            spec.altitude_ft, spec.desired_o2_pct, spec.range_min, spec.range_max
        );
    }
}

pub struct MonitorOptions {
    pub device_id: String,
    pub report_path: Option<PathBuf>,
    pub max_duration: Option<Duration>,
}

/// One console line summarizing the latest reading.
pub fn format_status(outcome: &ReadingOutcome) -> String {
    let reading = &outcome.reading;
    let mut line = format!(
        "Alt: {} ft | O2: {:.2}%",
        reading.altitude_ft, reading.o2_conc_pct
    );
    if let Some(spec) = outcome.spec {
        line.push_str(&format!(" (target {:.2}%)", spec.desired_o2_pct));
    }
    match (outcome.state, outcome.verdict) {
        (StabilizationState::Stabilizing, _) => line.push_str(&format!(
            " | Stabilizing: {:.0}s remaining",
            outcome.stabilization_remaining.as_secs_f64().ceil()
        )),
        (_, Some(verdict)) => line.push_str(&format!(" | Verdict: {}", verdict)),
        (_, None) => line.push_str(" | No specification"),
    }
    if let Some(band) = outcome.band {
        line.push_str(&format!(" | Band: {}", band));
    }
    if let Some(spo2) = reading.spo2 {
        line.push_str(&format!(" | SpO2: {:.0}%", spo2));
    }
    line
}

/// Runs a performance test on `link` and prints the result. Returns the
/// final report, or `None` if the run was cut short.
pub fn run_monitor<L: DeviceLink + 'static>(
    link: L,
    config: &AppConfig,
    table: SpecificationTable,
    timing: MonitorTiming,
    options: MonitorOptions,
) -> Result<Option<FinalReport>> {
    let log_path = log_file_path(
        &config.performance_log_dir,
        &options.device_id,
        Local::now().naive_local(),
    );
    let mut runner = MonitorBuilder::new()
        .with_spec_table(table)
        .with_timing(timing)
        .with_device_id(options.device_id.clone())
        .with_performance_log_to_file(&log_path)
        .build_runner(link)
        .context("Failed to set up performance monitoring")?;

    println!("\n--- Performance test: ROBD2-{} ---", options.device_id);
    println!("Logging to '{}'", log_path.display());

    let Some(events) = runner.start().context("Failed to start monitoring")? else {
        bail!("Monitoring is already running");
    };

    let started = Instant::now();
    let mut last_status: Option<Instant> = None;
    let mut gaps = 0u64;
    loop {
        if let Some(limit) = options.max_duration {
            if started.elapsed() >= limit {
                info!(seconds = limit.as_secs(), "Time limit reached before test completion");
                break;
            }
        }
        match events.recv_timeout(EVENT_POLL) {
            Ok(MonitorEvent::Reading(outcome)) => {
                if last_status.map_or(true, |t| t.elapsed() >= STATUS_INTERVAL) {
                    println!("{}", format_status(&outcome));
                    last_status = Some(Instant::now());
                }
            }
            Ok(MonitorEvent::TransportGap(fault)) => {
                gaps += 1;
                debug!(%fault, gaps, "transport gap");
            }
            Ok(MonitorEvent::Completed(_)) => break,
            Err(_) => {
                if !runner.is_running() {
                    break;
                }
            }
        }
    }
    runner.stop().context("Monitoring worker failed")?;
    if gaps > 0 {
        println!("{} sampling cycles returned no data", gaps);
    }

    let Some(report) = runner.final_report().cloned() else {
        println!("\nMonitoring stopped before the device returned to ground.");
        if let Some(results) = runner.altitude_results() {
            if !results.is_empty() {
                let partial = results.final_report(
                    Some(options.device_id.clone()),
                    Local::now().naive_local(),
                );
                println!("Partial results:\n{}", partial.to_report_string());
            }
        }
        return Ok(None);
    };

    println!("\n{}", report.to_report_string());
    if let Some(path) = &options.report_path {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        println!("Report written to '{}'", path.display());
    }
    Ok(Some(report))
}

/// Collects both calibration phases on `link` and prints the voltage table.
pub fn run_calibration<L: DeviceLink + 'static>(
    mut link: L,
    config: &AppConfig,
    device_id: &str,
    timing: CalibrationTiming,
) -> Result<CalibrationSummary> {
    let device_info = device::query_info(&mut link, timing.response_timeout);
    let log_path = log_file_path(&config.calibration_log_dir, device_id, Local::now().naive_local());
    let logger = CalibrationLogger::new(&log_path, device_id, &device_info)
        .context("Failed to create calibration log")?;

    println!("\n--- Calibration: ROBD2-{} ({}) ---", device_id, device_info);
    println!("Logging to '{}'", log_path.display());

    let runner = CalibrationRunner::spawn(
        CalibrationSession::new(Some(device_id.to_string())),
        link,
        timing,
        Some(logger),
    );
    let events = runner.events();
    let mut samples = 0usize;
    for event in events.iter() {
        match event {
            CalibrationEvent::PhaseStarted(phase) => {
                if phase == CalibrationPhase::PureO2 {
                    println!("Sensor input should now be on 100% O2.");
                }
                println!(
                    "Collecting {} readings ({} seconds)...",
                    phase,
                    timing.phase_duration.as_secs()
                );
            }
            CalibrationEvent::Sample { .. } => samples += 1,
            CalibrationEvent::TransportGap(fault) => debug!(%fault, "transport gap"),
            CalibrationEvent::Finished(_) => break,
        }
    }
    let session = runner.join().context("Calibration worker failed")?;
    let summary = session.summarize();

    println!("\n{} samples recorded", samples);
    println!("{}", summary.to_report_string());
    Ok(summary)
}
