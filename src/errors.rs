//! Error types for the measurement loop
//!
//! Each variant maps to one failure policy in the scheduler: configuration
//! errors stop the process before the loop starts, measurement and probe
//! launch errors skip a single iteration, and persistence errors stop the loop.

use std::io;
use thiserror::Error;

/// Errors raised by the probes, the record writer and configuration loading
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Configuration file missing, unreadable or holding invalid values
    #[error("Configuration error: {0}")]
    Config(String),

    /// The throughput test could not complete
    #[error("Bandwidth measurement failed: {0}")]
    Measurement(String),

    /// The ping utility could not be started
    #[error("Failed to launch ping: {0}")]
    ProbeLaunch(#[source] io::Error),

    /// The record file could not be created or appended to
    #[error("Failed to persist measurement: {0}")]
    Persistence(String),
}

impl MonitorError {
    /// Whether the scheduler may carry on with the next iteration after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MonitorError::Measurement(_) | MonitorError::ProbeLaunch(_)
        )
    }
}

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        MonitorError::Persistence(err.to_string())
    }
}

pub type MonitorResult<T> = std::result::Result<T, MonitorError>;
