//! Configuration loading
//!
//! The monitor is driven by a single INI file read once at startup:
//!
//! ```ini
//! [logging]
//! level = INFO
//! format = %(asctime)s - %(levelname)s - %(message)s
//!
//! [network]
//! gateway = 192.168.1.1
//!
//! [settings]
//! interval = 300
//! ```
//!
//! Any key can be overridden from the environment with
//! `NETPULSE_<SECTION>__<KEY>`, e.g. `NETPULSE_SETTINGS__INTERVAL=60`.

use log::LevelFilter;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{MonitorError, MonitorResult};

/// Default location of the configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.ini";

const DEFAULT_LOG_FILE: &str = "network_monitor.log";
const DEFAULT_RECORD_FILE: &str = "network_data.csv";
const DEFAULT_LOG_FORMAT: &str = "%(asctime)s - %(levelname)s - %(message)s";
const ENV_PREFIX: &str = "NETPULSE";

/// Validated, process-wide settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address probed by the latency prober
    pub gateway: String,
    /// Pause between two measurement cycles
    pub interval: Duration,
    pub log_level: LevelFilter,
    /// Line template in `%(field)s` style
    pub log_format: String,
    pub log_file: PathBuf,
    pub record_file: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    logging: RawLogging,
    network: RawNetwork,
    settings: RawSettings,
}

#[derive(Debug, Deserialize)]
struct RawLogging {
    level: String,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct RawNetwork {
    gateway: String,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    interval: i64,
    #[serde(default)]
    record: Option<PathBuf>,
}

impl Config {
    /// Reads and validates the INI file at `path`, applying environment overrides
    ///
    /// Relative `file`/`record` paths are resolved against the directory holding
    /// the configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> MonitorResult<Self> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Ini))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| {
                MonitorError::Config(format!("failed to read {}: {e}", path.display()))
            })?;

        let raw: RawConfig = settings
            .try_deserialize()
            .map_err(|e| MonitorError::Config(format!("invalid {}: {e}", path.display())))?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self::from_raw(raw, &base_dir)
    }

    fn from_raw(raw: RawConfig, base_dir: &Path) -> MonitorResult<Self> {
        let gateway = raw.network.gateway.trim().to_string();
        validate_gateway(&gateway)?;

        if raw.settings.interval <= 0 {
            return Err(MonitorError::Config(format!(
                "settings.interval must be a positive number of seconds, got {}",
                raw.settings.interval
            )));
        }

        let log_format = raw
            .logging
            .format
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FORMAT.to_string());

        let resolve = |p: Option<PathBuf>, default: &str| {
            let p = p.unwrap_or_else(|| PathBuf::from(default));
            if p.is_absolute() { p } else { base_dir.join(p) }
        };

        Ok(Self {
            gateway,
            interval: Duration::from_secs(raw.settings.interval as u64),
            log_level: parse_level(&raw.logging.level),
            log_format,
            log_file: resolve(raw.logging.file, DEFAULT_LOG_FILE),
            record_file: resolve(raw.settings.record, DEFAULT_RECORD_FILE),
        })
    }
}

/// Maps a case-insensitive severity name to a level filter
///
/// Unknown names fall back to `Info`.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" | "warning" => LevelFilter::Warn,
        "error" | "critical" | "fatal" => LevelFilter::Error,
        "off" | "none" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}

fn validate_gateway(gateway: &str) -> MonitorResult<()> {
    if gateway.is_empty() {
        return Err(MonitorError::Config("network.gateway is empty".to_string()));
    }
    // Passed straight to ping as an argument
    if gateway.starts_with('-') || gateway.chars().any(char::is_whitespace) {
        return Err(MonitorError::Config(format!(
            "network.gateway is not a valid host: {gateway:?}"
        )));
    }
    Ok(())
}
