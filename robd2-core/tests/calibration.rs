use approx::assert_abs_diff_eq;
use robd2_core::{
    calibration::{CalibrationEvent, CalibrationRunner, CalibrationSession},
    constants::CalibrationTiming,
    device::SimulatedDevice,
    logger::CalibrationLogger,
};
use robd2_schemas::calibration::CalibrationPhase;
use std::time::Duration;

fn fast_timing(phase_ms: u64) -> CalibrationTiming {
    CalibrationTiming {
        phase_duration: Duration::from_millis(phase_ms),
        sample_interval: Duration::from_millis(1),
        backoff: Duration::from_millis(1),
        response_timeout: Duration::from_millis(10),
        command_gap: Duration::ZERO,
    }
}

#[test]
fn collects_both_phases_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cal.csv");
    let logger = CalibrationLogger::new(&path, "9516", "ROBD2 SIMULATOR 1.0").unwrap();
    let device = SimulatedDevice::calibration_profile(1).with_jitter(0.0);

    let runner = CalibrationRunner::spawn(
        CalibrationSession::new(Some("9516".to_string())),
        device,
        fast_timing(30),
        Some(logger),
    );
    let events = runner.events();
    let session = runner.join().unwrap();

    let collected: Vec<CalibrationEvent> = events.try_iter().collect();
    let phases: Vec<CalibrationPhase> = collected
        .iter()
        .filter_map(|e| match e {
            CalibrationEvent::PhaseStarted(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(phases, CalibrationPhase::ALL.to_vec());
    assert!(matches!(collected.last(), Some(CalibrationEvent::Finished(_))));

    let summary = session.summarize();
    let room = summary.room_air.unwrap();
    let pure = summary.pure_o2.unwrap();
    assert_abs_diff_eq!(room.min, 0.996, epsilon = 1e-3);
    assert_abs_diff_eq!(pure.median, 4.741, epsilon = 1e-3);
    assert_abs_diff_eq!(pure.min, pure.max, epsilon = 1e-9);

    let rows = csv::Reader::from_path(&path).unwrap().records().count();
    assert_eq!(rows, 1 + room.samples + pure.samples);
}

#[test]
fn stop_skips_remaining_phases() {
    let runner = CalibrationRunner::spawn(
        CalibrationSession::default(),
        SimulatedDevice::calibration_profile(10),
        fast_timing(60_000),
        None,
    );
    std::thread::sleep(Duration::from_millis(20));
    runner.stop();
    let session = runner.join().unwrap();
    assert!(session.summarize().pure_o2.is_none());
    assert!(session.samples(CalibrationPhase::PureO2).is_empty());
}
