use anyhow::{bail, Context, Result};
use robd2_core::{
    constants::{CalibrationTiming, MonitorTiming},
    spec_table::SpecificationTable,
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "robd2.yaml";

/// Runtime settings, read from YAML. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub port: Option<PathBuf>,
    /// The port is expected to be configured for this rate already.
    pub baud_rate: u32,
    pub devices: Vec<String>,
    pub spec_table: Option<PathBuf>,
    pub performance_log_dir: PathBuf,
    pub calibration_log_dir: PathBuf,
    pub timing: TimingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 9600,
            devices: vec!["9515".to_string(), "9516".to_string(), "9471".to_string()],
            spec_table: None,
            performance_log_dir: PathBuf::from("performance_logs"),
            calibration_log_dir: PathBuf::from("calibration_logs"),
            timing: TimingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub sample_interval_ms: u64,
    pub backoff_ms: u64,
    pub stabilization_secs: u64,
    pub response_timeout_ms: u64,
    pub command_gap_ms: u64,
    pub calibration_phase_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 200,
            backoff_ms: 500,
            stabilization_secs: 25,
            response_timeout_ms: 1000,
            command_gap_ms: 100,
            calibration_phase_secs: 30,
        }
    }
}

impl TimingConfig {
    pub fn monitor(&self) -> MonitorTiming {
        MonitorTiming {
            stabilization: Duration::from_secs(self.stabilization_secs),
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            backoff: Duration::from_millis(self.backoff_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            command_gap: Duration::from_millis(self.command_gap_ms),
        }
    }

    pub fn calibration(&self) -> CalibrationTiming {
        CalibrationTiming {
            phase_duration: Duration::from_secs(self.calibration_phase_secs),
            sample_interval: Duration::from_millis(self.sample_interval_ms),
            backoff: Duration::from_millis(self.backoff_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            command_gap: Duration::from_millis(self.command_gap_ms),
        }
    }
}

impl AppConfig {
    /// Loads `path`, or `robd2.yaml` from the working directory if it exists,
    /// or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// The configured table, or the reference table when none is set.
    pub fn load_spec_table(&self) -> Result<SpecificationTable> {
        match &self.spec_table {
            Some(path) => SpecificationTable::from_yaml_file(path)
                .with_context(|| format!("Failed to load specification table: {}", path.display())),
            None => Ok(SpecificationTable::reference()),
        }
    }

    /// Picks the requested device, or the first configured one.
    pub fn resolve_device(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(id) => {
                if !self.devices.iter().any(|d| d == id) {
                    warn!(device = id, known = ?self.devices, "Device is not in the configured list");
                }
                Ok(id.to_string())
            }
            None => match self.devices.first() {
                Some(id) => Ok(id.clone()),
                None => bail!("No device given and none configured"),
            },
        }
    }

    pub fn resolve_port(&self, requested: Option<&Path>) -> Result<PathBuf> {
        match requested.map(Path::to_path_buf).or_else(|| self.port.clone()) {
            Some(port) => Ok(port),
            None => bail!("No device port given; pass --port, set `port` in the config, or use --demo"),
        }
    }
}
