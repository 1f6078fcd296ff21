//! Charts generated from performance logs.

use anyhow::{Context, Result};
use plotters::prelude::*;
use robd2_core::logger::{read_performance_log, PerformanceLogRecord};
use robd2_schemas::verdict::Verdict;
use std::path::{Path, PathBuf};

/// `<log>.png` next to the log.
pub fn default_plot_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("png")
}

/// Plots actual against desired O2 with the acceptance band, one point per
/// logged reading. Returns the number of readings plotted.
pub fn plot_performance_log(log_path: &Path, out_path: &Path) -> Result<usize> {
    let records = read_performance_log(log_path)
        .with_context(|| format!("Failed to read performance log: {}", log_path.display()))?;
    if records.is_empty() {
        println!("[Plotting] Warning: '{}' has no readings to plot.", log_path.display());
        return Ok(0);
    }
    draw_o2_trace(&records, out_path)
        .with_context(|| format!("Failed to draw chart: {}", out_path.display()))?;
    Ok(records.len())
}

fn o2_bounds(records: &[PerformanceLogRecord]) -> (f64, f64) {
    let (lo, hi) = records.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (
            lo.min(r.actual_o2).min(r.range_min),
            hi.max(r.actual_o2).max(r.range_max),
        )
    });
    ((lo - 1.0).max(0.0), hi + 1.0)
}

fn draw_o2_trace(records: &[PerformanceLogRecord], out_path: &Path) -> Result<()> {
    let root = BitMapBackend::new(out_path, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = o2_bounds(records);
    let mut chart = ChartBuilder::on(&root)
        .caption("O2 Concentration vs Specification", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..records.len(), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Reading")
        .y_desc("O2 (%)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            records.iter().enumerate().map(|(i, r)| (i, r.range_min)),
            RED.mix(0.5).stroke_width(1),
        ))?
        .label("Acceptance band")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.mix(0.5).stroke_width(1)));
    chart.draw_series(LineSeries::new(
        records.iter().enumerate().map(|(i, r)| (i, r.range_max)),
        RED.mix(0.5).stroke_width(1),
    ))?;

    chart
        .draw_series(LineSeries::new(
            records.iter().enumerate().map(|(i, r)| (i, r.desired_o2)),
            GREEN.stroke_width(2),
        ))?
        .label("Desired O2")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN.filled()));

    chart
        .draw_series(LineSeries::new(
            records.iter().enumerate().map(|(i, r)| (i, r.actual_o2)),
            BLUE.stroke_width(2),
        ))?
        .label("Actual O2")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.filled()));

    chart.draw_series(
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.verdict == Verdict::Review || r.verdict == Verdict::Error)
            .map(|(i, r)| Circle::new((i, r.actual_o2), 4, MAGENTA.filled())),
    )?;

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_swaps_extension() {
        assert_eq!(
            default_plot_path(Path::new("logs/ROBD2_9515_20240301_101500.csv")),
            PathBuf::from("logs/ROBD2_9515_20240301_101500.png")
        );
    }

    #[test]
    fn empty_log_plots_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("empty.csv");
        robd2_core::logger::PerformanceLogger::new(&log).unwrap();
        let out = dir.path().join("empty.png");
        assert_eq!(plot_performance_log(&log, &out).unwrap(), 0);
        assert!(!out.exists());
    }

    #[test]
    fn missing_log_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(plot_performance_log(&dir.path().join("nope.csv"), &dir.path().join("x.png")).is_err());
    }
}
