use crate::altitude::AltitudeSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SpecTableFile {
    pub schema_version: String,
    pub altitudes: Vec<AltitudeSpec>,
}
