//! Throughput probe using Cloudflare's public speed test endpoints
//!
//! The download test streams random bytes from `speed.cloudflare.com/__down`,
//! the upload test posts a zero-filled body to `__up`. Server selection is
//! left to Cloudflare's anycast routing. Each phase stops at whichever comes
//! first: its byte budget or its time budget. Throughput is computed from the
//! bytes actually moved, so a slow link yields a low reading instead of a
//! timeout. Raw bytes per second are converted to megabits per second
//! (`* 8 / 1_000_000`).

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use log::{debug, info};
use reqwest::{Body, Client};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::errors::{MonitorError, MonitorResult};

const DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down";
const UPLOAD_URL: &str = "https://speed.cloudflare.com/__up";

/// 25 MB keeps the test above TCP slow-start on typical home links
const DEFAULT_DOWNLOAD_BYTES: u64 = 25_000_000;

/// Upload is usually the slower direction
const DEFAULT_UPLOAD_BYTES: u64 = 10_000_000;

/// Time budget of each phase
const DEFAULT_PHASE_DURATION: Duration = Duration::from_secs(15);

/// Extra time a request may take past its phase budget before it is abandoned
const RESPONSE_GRACE: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const UPLOAD_CHUNK_BYTES: u64 = 64 * 1024;

/// Download and upload throughput of one test run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthResult {
    pub download_mbps: f64,
    pub upload_mbps: f64,
}

/// Measures achievable throughput
#[async_trait]
pub trait BandwidthProbe: Send + Sync {
    /// Runs a download test followed by an upload test
    async fn measure_bandwidth(&self) -> MonitorResult<BandwidthResult>;
}

/// Converts a byte count transferred over `elapsed` into megabits per second
///
/// ```
/// use std::time::Duration;
/// use netpulse::probes::bandwidth::megabits_per_second;
///
/// assert_eq!(megabits_per_second(1_250_000, Duration::from_secs(1)), Some(10.0));
/// assert_eq!(megabits_per_second(1_000, Duration::ZERO), None);
/// ```
pub fn megabits_per_second(bytes: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return None;
    }
    Some(bytes as f64 * 8.0 / secs / 1_000_000.0)
}

/// HTTP speed test client
#[derive(Debug, Clone)]
pub struct HttpSpeedTest {
    client: Client,
    download_url: String,
    upload_url: String,
    download_bytes: u64,
    upload_bytes: u64,
    phase_duration: Duration,
}

impl HttpSpeedTest {
    /// Creates a client against the public Cloudflare endpoints
    pub fn new() -> MonitorResult<Self> {
        Self::with_endpoints(DOWNLOAD_URL, UPLOAD_URL)
    }

    /// Creates a client against custom endpoints speaking the same protocol
    ///
    /// The download endpoint must honour a `bytes` query parameter.
    pub fn with_endpoints(
        download_url: impl Into<String>,
        upload_url: impl Into<String>,
    ) -> MonitorResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| MonitorError::Measurement(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            download_url: download_url.into(),
            upload_url: upload_url.into(),
            download_bytes: DEFAULT_DOWNLOAD_BYTES,
            upload_bytes: DEFAULT_UPLOAD_BYTES,
            phase_duration: DEFAULT_PHASE_DURATION,
        })
    }

    /// Overrides the byte budgets of both phases
    pub fn with_sizes(mut self, download_bytes: u64, upload_bytes: u64) -> Self {
        self.download_bytes = download_bytes;
        self.upload_bytes = upload_bytes;
        self
    }

    /// Overrides the time budget of each phase
    pub fn with_phase_duration(mut self, phase_duration: Duration) -> Self {
        self.phase_duration = phase_duration;
        self
    }

    async fn run_download(&self) -> MonitorResult<f64> {
        debug!(
            "Starting download test ({} bytes, {:?} budget)",
            self.download_bytes, self.phase_duration
        );

        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.phase_duration;
        let response = self
            .client
            .get(&self.download_url)
            .query(&[("bytes", self.download_bytes)])
            .timeout(self.phase_duration + RESPONSE_GRACE)
            .send()
            .await
            .map_err(|e| MonitorError::Measurement(format!("download request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MonitorError::Measurement(format!(
                "download failed with status {}",
                response.status()
            )));
        }

        let mut received: u64 = 0;
        let mut chunks = response.bytes_stream();
        loop {
            match tokio::time::timeout_at(deadline, chunks.next()).await {
                Ok(Some(chunk)) => {
                    let chunk = chunk.map_err(|e| {
                        MonitorError::Measurement(format!("download stream error: {e}"))
                    })?;
                    received += chunk.len() as u64;
                }
                Ok(None) => break,
                Err(_) => {
                    debug!("Download phase reached its time budget");
                    break;
                }
            }
        }

        let elapsed = start.elapsed();
        debug!("Downloaded {} bytes in {:.2?}", received, elapsed);
        if received == 0 {
            return Err(MonitorError::Measurement(
                "download received no data".to_string(),
            ));
        }
        megabits_per_second(received, elapsed).ok_or_else(|| {
            MonitorError::Measurement("download completed too fast to measure".to_string())
        })
    }

    async fn run_upload(&self) -> MonitorResult<f64> {
        debug!(
            "Starting upload test ({} bytes, {:?} budget)",
            self.upload_bytes, self.phase_duration
        );

        let offered = Arc::new(AtomicU64::new(0));
        let deadline = tokio::time::Instant::now() + self.phase_duration;
        let body = upload_body(self.upload_bytes, deadline, offered.clone());

        let start = Instant::now();
        let response = self
            .client
            .post(&self.upload_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .timeout(self.phase_duration + RESPONSE_GRACE)
            .body(body)
            .send()
            .await
            .map_err(|e| MonitorError::Measurement(format!("upload request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(MonitorError::Measurement(format!(
                "upload failed with status {}",
                response.status()
            )));
        }
        // Timing covers the full exchange, response body included
        response
            .bytes()
            .await
            .map_err(|e| MonitorError::Measurement(format!("upload response error: {e}")))?;

        let elapsed = start.elapsed();
        let sent = offered.load(Ordering::Relaxed);
        debug!("Uploaded {} bytes in {:.2?}", sent, elapsed);
        if sent == 0 {
            return Err(MonitorError::Measurement("upload sent no data".to_string()));
        }
        megabits_per_second(sent, elapsed).ok_or_else(|| {
            MonitorError::Measurement("upload completed too fast to measure".to_string())
        })
    }
}

/// Zero-filled request body that ends at `total` bytes or at `deadline`
///
/// `offered` counts the bytes handed to the connection.
fn upload_body(total: u64, deadline: tokio::time::Instant, offered: Arc<AtomicU64>) -> Body {
    let chunks = stream::unfold(0u64, move |sent| {
        let offered = offered.clone();
        async move {
            if sent >= total || tokio::time::Instant::now() >= deadline {
                return None;
            }
            let len = (total - sent).min(UPLOAD_CHUNK_BYTES);
            offered.fetch_add(len, Ordering::Relaxed);
            Some((Ok::<_, io::Error>(vec![0u8; len as usize]), sent + len))
        }
    });
    Body::wrap_stream(chunks)
}

#[async_trait]
impl BandwidthProbe for HttpSpeedTest {
    async fn measure_bandwidth(&self) -> MonitorResult<BandwidthResult> {
        let download_mbps = self.run_download().await?;
        let upload_mbps = self.run_upload().await?;

        info!(
            "Download speed: {:.2} Mbps, Upload speed: {:.2} Mbps",
            download_mbps, upload_mbps
        );

        Ok(BandwidthResult {
            download_mbps,
            upload_mbps,
        })
    }
}
