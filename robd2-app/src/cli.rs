use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "robd2", version, about = "Performance and calibration diagnostics for ROBD2 devices")]
pub struct Cli {
    /// YAML configuration file (defaults to ./robd2.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Trace-level diagnostics on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the active altitude specification table
    Specs,

    /// Run a performance test until the device returns to ground
    Monitor {
        /// Device identifier (defaults to the first configured device)
        #[arg(short, long)]
        device: Option<String>,

        /// Use the built-in simulated device instead of a port
        #[arg(long)]
        demo: bool,

        /// Device path, overriding the configured port
        #[arg(short, long)]
        port: Option<PathBuf>,

        /// Write the final report as JSON
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Stop after this many seconds even if the test has not completed
        #[arg(long)]
        max_seconds: Option<u64>,
    },

    /// Record room-air and 100% O2 calibration voltages
    Calibrate {
        #[arg(short, long)]
        device: Option<String>,

        #[arg(long)]
        demo: bool,

        #[arg(short, long)]
        port: Option<PathBuf>,
    },

    /// Chart actual against desired O2 from a performance log
    Plot {
        log: PathBuf,

        /// Output PNG (defaults to the log path with a .png extension)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}
