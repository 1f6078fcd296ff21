use serde::{Deserialize, Serialize};
use std::fmt;

/// The subset of the device command language this tool issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceCommand {
    GetRunAll,
    GetAdc { channel: u8 },
    GetRunO2Conc,
    GetInfo,
}

impl DeviceCommand {
    /// Primary O2 sensor voltage.
    pub const ADC_PRIMARY: DeviceCommand = DeviceCommand::GetAdc { channel: 1 };
    /// Reference O2 sensor voltage, also used for calibration.
    pub const ADC_REFERENCE: DeviceCommand = DeviceCommand::GetAdc { channel: 12 };
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCommand::GetRunAll => f.write_str("GET RUN ALL"),
            DeviceCommand::GetAdc { channel } => write!(f, "GET ADC {}", channel),
            DeviceCommand::GetRunO2Conc => f.write_str("GET RUN O2CONC"),
            DeviceCommand::GetInfo => f.write_str("GET INFO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_wire_commands() {
        assert_eq!(DeviceCommand::GetRunAll.to_string(), "GET RUN ALL");
        assert_eq!(DeviceCommand::ADC_PRIMARY.to_string(), "GET ADC 1");
        assert_eq!(DeviceCommand::ADC_REFERENCE.to_string(), "GET ADC 12");
        assert_eq!(DeviceCommand::GetRunO2Conc.to_string(), "GET RUN O2CONC");
        assert_eq!(DeviceCommand::GetInfo.to_string(), "GET INFO");
    }
}
