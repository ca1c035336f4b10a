//! Measurement scheduler
//!
//! Each cycle runs the bandwidth probe, then the latency probe, then appends
//! one row to the record, then sleeps for the configured interval. A failed
//! bandwidth test or an unlaunchable ping skips the cycle: no ping attempt
//! after a bandwidth failure and no partial row. A missing ping reply only
//! leaves the ping cell empty. Persistence failures end the loop.

use log::{debug, error, info, warn};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{MonitorError, MonitorResult};
use crate::models::MeasurementSample;
use crate::probes::{BandwidthProbe, LatencyProbe};
use crate::shipping::{DisabledShipper, LogShipper};
use crate::storage::RecordWriter;

/// What a single cycle produced
#[derive(Debug)]
pub enum IterationOutcome {
    /// A row was appended
    Recorded(MeasurementSample),
    /// The cycle was abandoned after a recoverable error
    Skipped(MonitorError),
}

impl IterationOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, IterationOutcome::Recorded(_))
    }
}

pub struct Monitor {
    gateway: String,
    interval: Duration,
    log_file: PathBuf,
    bandwidth: Box<dyn BandwidthProbe>,
    latency: Box<dyn LatencyProbe>,
    writer: RecordWriter,
    shipper: Box<dyn LogShipper>,
    iteration: u64,
}

impl Monitor {
    pub fn new(
        config: &Config,
        bandwidth: Box<dyn BandwidthProbe>,
        latency: Box<dyn LatencyProbe>,
        writer: RecordWriter,
    ) -> Self {
        Self {
            gateway: config.gateway.clone(),
            interval: config.interval,
            log_file: config.log_file.clone(),
            bandwidth,
            latency,
            writer,
            shipper: Box::new(DisabledShipper),
            iteration: 0,
        }
    }

    /// Replaces the default no-op log shipper
    pub fn with_shipper(mut self, shipper: Box<dyn LogShipper>) -> Self {
        self.shipper = shipper;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn iterations(&self) -> u64 {
        self.iteration
    }

    /// Runs one measure-and-record cycle
    ///
    /// Recoverable failures are logged and returned as `Skipped`; only a
    /// persistence failure is returned as an error.
    pub async fn run_iteration(&mut self) -> MonitorResult<IterationOutcome> {
        self.iteration += 1;
        debug!("Starting measurement cycle #{}", self.iteration);

        let bandwidth = match self.bandwidth.measure_bandwidth().await {
            Ok(result) => result,
            Err(e) => return Ok(self.skip(e)),
        };

        let ping_ms = match self.latency.measure_latency(&self.gateway).await {
            Ok(ping) => ping,
            Err(e) => return Ok(self.skip(e)),
        };

        let sample = MeasurementSample::now(bandwidth.download_mbps, bandwidth.upload_mbps, ping_ms);
        if let Err(e) = self.writer.append(&sample) {
            error!("An error occurred: {}", e);
            return Err(e);
        }

        if let Err(e) = self.shipper.ship(&self.log_file) {
            warn!("Log shipper '{}' failed: {:#}", self.shipper.name(), e);
        }

        Ok(IterationOutcome::Recorded(sample))
    }

    /// Measures every interval until `shutdown` resolves
    ///
    /// Returns `Ok(())` on shutdown and the first persistence error otherwise.
    pub async fn run<F>(&mut self, shutdown: F) -> MonitorResult<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Monitoring gateway {} every {}s, recording to {}",
            self.gateway,
            self.interval.as_secs(),
            self.writer.path().display()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                result = self.run_iteration() => {
                    result?;
                }
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Shutdown requested after {} cycles", self.iteration);
        Ok(())
    }

    fn skip(&self, err: MonitorError) -> IterationOutcome {
        debug_assert!(err.is_recoverable());
        error!("An error occurred: {}", err);
        IterationOutcome::Skipped(err)
    }
}
