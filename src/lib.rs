//! netpulse: unattended bandwidth and latency logger
//!
//! The binary wires these modules together; they are exposed as a library so
//! the measurement loop can be driven with substitute probes.

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod probes;
pub mod shipping;
pub mod storage;

pub use config::Config;
pub use errors::{MonitorError, MonitorResult};
pub use monitor::{IterationOutcome, Monitor};
