//! Options shared by both binaries.

use std::path::PathBuf;

use clap::Args;

use crate::logging::Verbosity;

/// Configuration and verbosity flags.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonOptions {
    /// Path to custom configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl CommonOptions {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
