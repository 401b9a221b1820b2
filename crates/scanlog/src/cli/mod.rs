//! Command-line interfaces for the `scanlog` and `scanview` binaries.

mod options;

use clap::Parser;

pub use options::CommonOptions;

use crate::logging::Verbosity;

/// scanlog - Record servo scanner readings from a serial port
///
/// Reads `Angle: <deg> | Distance: <m> m.` lines from the device and appends
/// each one to the scan database. Other lines are echoed and skipped.
#[derive(Debug, Parser)]
#[command(name = "scanlog")]
#[command(author, version, about, long_about = None)]
pub struct LoggerCli {
    /// Serial port to read from (overrides `serial.port`)
    #[arg(value_name = "PORT")]
    pub port: Option<String>,

    /// Configuration and verbosity flags
    #[command(flatten)]
    pub options: CommonOptions,
}

/// scanview - Terminal dashboard for recorded scans
///
/// Polls the scan database and redraws a polar plot of the latest scan
/// together with the full reading history.
#[derive(Debug, Parser)]
#[command(name = "scanview")]
#[command(author, version, about, long_about = None)]
pub struct ViewerCli {
    /// Configuration and verbosity flags
    #[command(flatten)]
    pub options: CommonOptions,
}

impl LoggerCli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.options.verbosity()
    }
}

impl ViewerCli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.options.verbosity()
    }
}
