use clap::Parser;
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

/// Command line of the netpulse daemon
/// Everything else comes from the configuration file
#[derive(Parser, Debug)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Periodically measure bandwidth and gateway latency and append the results to a CSV record")]
#[command(long_about = "netpulse runs in the foreground, measuring download/upload throughput and the \
round-trip time to the configured gateway every interval. Results are appended to a CSV file and \
status is logged to a file rotated at midnight. Stop it with Ctrl-C or SIGTERM.\n\n\
Examples:\n  \
netpulse                              # Use ./config.ini\n  \
netpulse --config /etc/netpulse.ini   # Use another configuration file")]
pub struct Cli {
    /// Path of the INI configuration file
    #[arg(
        short,
        long,
        default_value = DEFAULT_CONFIG_PATH,
        help = "Configuration file with [logging], [network] and [settings] sections"
    )]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["netpulse"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("config.ini"));
    }

    #[test]
    fn test_custom_config_path() {
        let cli = Cli::try_parse_from(["netpulse", "--config", "/etc/netpulse.ini"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/netpulse.ini"));
    }

    #[test]
    fn test_rejects_unknown_flags() {
        assert!(Cli::try_parse_from(["netpulse", "--interval", "5"]).is_err());
    }
}
