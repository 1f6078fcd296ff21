pub mod altitude;
pub mod calibration;
pub mod command;
pub mod file_formats;
pub mod reading;
pub mod stats;
pub mod verdict;
