//! Gateway latency probe
//!
//! Sends a single ICMP echo request through the system `ping` utility and
//! extracts the round-trip time from its output. The child runs under the C
//! locale where the platform honours it, and the parser does not depend on the
//! localized word for "time" anyway: it looks for the first `=<number>ms` or
//! `<<number>ms` token, which every `ping` we know of prints for a reply.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::process::Stdio;
use tokio::process::Command;

use crate::errors::{MonitorError, MonitorResult};

/// Measures round-trip time to a host
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    /// Returns the RTT in milliseconds, `None` when no reply could be read
    ///
    /// Only a failure to run the probe at all is reported as an error.
    async fn measure_latency(&self, gateway: &str) -> MonitorResult<Option<f64>>;
}

/// Latency probe backed by the platform `ping` command
#[derive(Debug, Clone)]
pub struct SystemPing {
    program: String,
}

impl Default for SystemPing {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPing {
    pub fn new() -> Self {
        Self {
            program: "ping".to_string(),
        }
    }

    /// Uses another executable with ping-compatible arguments
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, gateway: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        if cfg!(windows) {
            cmd.args(["-n", "1", gateway]);
        } else {
            // -n: numeric output, no reverse lookups
            cmd.args(["-n", "-c", "1", gateway]);
        }
        cmd.env("LC_ALL", "C")
            .env("LANG", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl LatencyProbe for SystemPing {
    async fn measure_latency(&self, gateway: &str) -> MonitorResult<Option<f64>> {
        let output = self
            .command(gateway)
            .output()
            .await
            .map_err(MonitorError::ProbeLaunch)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            debug!(
                "ping {} exited with {} (stderr={})",
                gateway,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        // Some platforms exit non-zero yet still print a reply line; trust the reply
        match parse_round_trip_ms(&stdout) {
            Some(ms) => {
                info!("Ping to {}: {} ms", gateway, ms);
                Ok(Some(ms))
            }
            None => {
                warn!("Ping to {} failed", gateway);
                Ok(None)
            }
        }
    }
}

/// Extracts the first round-trip time from `ping` output
///
/// Accepts `time=14.2 ms`, `tiempo=14ms`, `Zeit=3ms`, `time<1ms` and comma
/// decimals (`Zeit=14,2 ms`). A `<` reading reports its bound, so `time<1ms`
/// becomes `1.0`.
///
/// ```
/// use netpulse::probes::latency::parse_round_trip_ms;
///
/// let reply = "64 bytes from 192.0.2.1: icmp_seq=1 ttl=64 time=14.2 ms";
/// assert_eq!(parse_round_trip_ms(reply), Some(14.2));
/// assert_eq!(parse_round_trip_ms("Request timed out."), None);
/// ```
pub fn parse_round_trip_ms(output: &str) -> Option<f64> {
    output.lines().find_map(parse_line)
}

fn parse_line(line: &str) -> Option<f64> {
    line.match_indices(['=', '<'])
        .find_map(|(idx, _)| parse_value_before_ms(&line[idx + 1..]))
}

/// Reads `<number>[ ]ms` at the start of `text`
fn parse_value_before_ms(text: &str) -> Option<f64> {
    let number_len = text
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|(i, c)| i + c.len_utf8())
        .last()?;

    let unit = text[number_len..].trim_start();
    if !unit.starts_with("ms") {
        return None;
    }
    // Reject "msec"-style suffixes that belong to summary lines
    if unit[2..].chars().next().is_some_and(char::is_alphabetic) {
        return None;
    }

    let value: f64 = text[..number_len].replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}
