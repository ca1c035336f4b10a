//! Measurement sources
//!
//! - `bandwidth`: download/upload throughput over HTTP
//! - `latency`: round-trip time to the gateway via the system `ping`

pub mod bandwidth;
pub mod latency;

pub use bandwidth::{BandwidthProbe, BandwidthResult, HttpSpeedTest};
pub use latency::{LatencyProbe, SystemPing};
