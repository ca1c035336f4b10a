use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use netpulse::cli::Cli;
use netpulse::probes::{HttpSpeedTest, SystemPing};
use netpulse::storage::RecordWriter;
use netpulse::{Config, Monitor, logging};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    logging::init(&config)?;
    info!("netpulse {} starting", env!("CARGO_PKG_VERSION"));

    let writer = RecordWriter::new(&config.record_file);
    writer
        .ensure_initialized()
        .context("Failed to initialize the measurement record")?;

    let bandwidth = HttpSpeedTest::new()?;
    let mut monitor = Monitor::new(
        &config,
        Box::new(bandwidth),
        Box::new(SystemPing::new()),
        writer,
    );

    if let Err(e) = monitor.run(shutdown_signal()).await {
        error!("Stopping: {}", e);
        return Err(e.into());
    }

    info!("netpulse stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
