//! `scanview` - terminal dashboard for recorded scans
//!
//! Redraws the dashboard from the scan database every refresh interval until
//! interrupted.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use scanlog::cli::ViewerCli;
use scanlog::{init_logging, Config, Viewer};

/// Clear the screen and move the cursor home.
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = ViewerCli::parse();

    init_logging(cli.verbosity());

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &ViewerCli) -> anyhow::Result<()> {
    let config =
        Config::load_from(cli.options.config.clone()).context("failed to load configuration")?;
    let viewer = Viewer::new(config.database_path(), config.viewer);
    info!("Watching {}", viewer.database_path().display());

    loop {
        let refresh = viewer.refresh();
        print!("{CLEAR_SCREEN}{}", viewer.render(&refresh));
        std::io::stdout()
            .flush()
            .context("failed to write dashboard")?;

        tokio::select! {
            () = tokio::time::sleep(viewer.refresh_interval()) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Viewer stopped.");
                return Ok(());
            }
        }
    }
}
