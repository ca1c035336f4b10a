//! Log shipping hook
//!
//! After every recorded sample the monitor hands the active log file to a
//! [`LogShipper`]. Nothing is shipped by default; a syslog or HTTP forwarder
//! implements the trait and is passed to `Monitor::with_shipper`.

use anyhow::Result;
use std::path::Path;

/// Destination for the monitor's log output
pub trait LogShipper: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Forwards whatever is new in `log_file`
    ///
    /// Failures are reported as warnings and never stop the monitor.
    fn ship(&self, log_file: &Path) -> Result<()>;
}

/// Shipper that keeps logs local
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledShipper;

impl LogShipper for DisabledShipper {
    fn name(&self) -> &str {
        "disabled"
    }

    fn ship(&self, _log_file: &Path) -> Result<()> {
        Ok(())
    }
}
