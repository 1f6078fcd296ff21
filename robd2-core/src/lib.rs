pub mod calibration;
pub mod constants;
pub mod device;
pub mod error;
pub mod logger;
pub mod monitor;
pub mod results;
pub mod spec_table;
pub mod stabilization;
pub mod statistics;
pub mod verdict;
pub mod window;
