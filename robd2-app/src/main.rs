use anyhow::Result;
use clap::Parser;
use robd2_core::device::SimulatedDevice;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod link;
mod plotting;
mod workflow;

use cli::{Cli, Command};
use config::AppConfig;
use link::StreamLink;
use workflow::MonitorOptions;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Specs => {
            let table = config.load_spec_table()?;
            workflow::print_specs(&table);
        }
        Command::Monitor {
            device,
            demo,
            port,
            report,
            max_seconds,
        } => {
            let table = config.load_spec_table()?;
            let options = MonitorOptions {
                device_id: config.resolve_device(device.as_deref())?,
                report_path: report,
                max_duration: max_seconds.map(std::time::Duration::from_secs),
            };
            if demo {
                workflow::run_monitor(
                    SimulatedDevice::training_profile(),
                    &config,
                    table,
                    workflow::demo_monitor_timing(),
                    options,
                )?;
            } else {
                let link = StreamLink::open(&config.resolve_port(port.as_deref())?)?;
                workflow::run_monitor(link, &config, table, config.timing.monitor(), options)?;
            }
        }
        Command::Calibrate { device, demo, port } => {
            let device_id = config.resolve_device(device.as_deref())?;
            if demo {
                workflow::run_calibration(
                    SimulatedDevice::calibration_profile(40),
                    &config,
                    &device_id,
                    workflow::demo_calibration_timing(),
                )?;
            } else {
                let link = StreamLink::open(&config.resolve_port(port.as_deref())?)?;
                workflow::run_calibration(link, &config, &device_id, config.timing.calibration())?;
            }
        }
        Command::Plot { log, out } => {
            let out = out.unwrap_or_else(|| plotting::default_plot_path(&log));
            let plotted = plotting::plot_performance_log(&log, &out)?;
            if plotted > 0 {
                println!("Plotted {} readings to '{}'", plotted, out.display());
            }
        }
    }

    Ok(())
}
