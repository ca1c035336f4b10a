//! Log output of the measurement loop
//! The global logger can only be installed once per process, so every
//! expectation lives in a single test that writes to a temporary log file

#![cfg(unix)]

use async_trait::async_trait;
use log::LevelFilter;
use netpulse::probes::{BandwidthProbe, BandwidthResult, SystemPing};
use netpulse::storage::RecordWriter;
use netpulse::{Config, Monitor, MonitorError, MonitorResult, logging};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

struct StaticBandwidth {
    result: Option<BandwidthResult>,
}

#[async_trait]
impl BandwidthProbe for StaticBandwidth {
    async fn measure_bandwidth(&self) -> MonitorResult<BandwidthResult> {
        self.result
            .ok_or_else(|| MonitorError::Measurement("speed test server unreachable".into()))
    }
}

fn log_lines(config: &Config) -> Vec<String> {
    fs::read_to_string(&config.log_file)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_cycle_log_lines() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        gateway: "192.0.2.1".to_string(),
        interval: Duration::from_secs(5),
        log_level: LevelFilter::Info,
        log_format: "%(levelname)s - %(message)s".to_string(),
        log_file: dir.path().join("network_monitor.log"),
        record_file: dir.path().join("network_data.csv"),
    };
    logging::init(&config).expect("Logger should install once");

    let writer = RecordWriter::new(&config.record_file);
    writer.ensure_initialized().unwrap();

    // `true` exits cleanly without printing a reply
    let mut monitor = Monitor::new(
        &config,
        Box::new(StaticBandwidth {
            result: Some(BandwidthResult {
                download_mbps: 87.53,
                upload_mbps: 12.1,
            }),
        }),
        Box::new(SystemPing::with_program("true")),
        RecordWriter::new(&config.record_file),
    );
    assert!(monitor.run_iteration().await.unwrap().is_recorded());

    let lines = log_lines(&config);
    let warnings: Vec<_> = lines
        .iter()
        .filter(|line| line.starts_with("WARNING - "))
        .collect();
    assert_eq!(warnings, vec!["WARNING - Ping to 192.0.2.1 failed"]);
    assert!(!lines.iter().any(|line| line.starts_with("ERROR - ")));

    let seen = lines.len();
    let mut monitor = Monitor::new(
        &config,
        Box::new(StaticBandwidth { result: None }),
        Box::new(SystemPing::with_program("true")),
        writer,
    );
    assert!(!monitor.run_iteration().await.unwrap().is_recorded());

    let lines = log_lines(&config);
    let new_lines = &lines[seen..];
    let errors: Vec<_> = new_lines
        .iter()
        .filter(|line| line.starts_with("ERROR - "))
        .collect();
    assert_eq!(errors.len(), 1, "new log lines were {new_lines:?}");
    assert!(errors[0].starts_with("ERROR - An error occurred:"));
    assert!(errors[0].contains("speed test server unreachable"));
    // No ping after a failed bandwidth test
    assert!(!new_lines.iter().any(|line| line.contains("Ping to")));
}
