//! `scanlog` - record servo scanner readings
//!
//! Opens the serial port, streams readings into the scan database and stops
//! cleanly on Ctrl-C or when the device goes away.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info};

use scanlog::cli::LoggerCli;
use scanlog::source::SerialLineSource;
use scanlog::{
    exit_status, init_logging, open_serial, Config, RunOutcome, Session, SessionReport, StopHandle,
    Storage,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = LoggerCli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: LoggerCli) -> anyhow::Result<ExitCode> {
    let config = Config::load_with_port(cli.options.config.clone(), cli.port)
        .context("failed to load configuration")?;

    let db_path = config.database_path();
    Storage::initialize(&db_path)
        .with_context(|| format!("failed to initialize database at {}", db_path.display()))?;

    let storage = Storage::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;

    info!(
        "Attempting to connect to {} at {} baud...",
        config.serial.port,
        config.serial.baud_rate
    );
    let outcome: RunOutcome = match Session::connect(|| open_serial(&config.serial), storage) {
        Ok(session) => Ok(stream(session).await?),
        Err(failure) => Err(failure),
    };

    Ok(ExitCode::from(exit_status(&outcome)))
}

/// Run the session on a blocking thread until it ends or Ctrl-C arrives.
async fn stream(session: Session<SerialLineSource, Storage>) -> anyhow::Result<SessionReport> {
    let stop = StopHandle::new();
    let worker_stop = stop.clone();
    let mut worker = tokio::task::spawn_blocking(move || session.run(&worker_stop));

    let report = tokio::select! {
        joined = &mut worker => joined.context("logging task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            stop.stop();
            worker.await.context("logging task panicked")?
        }
    };

    debug!(
        "Session ended ({}): {} logged, {} noise, {} undecodable, {} blank",
        report.state,
        report.stats.readings_logged,
        report.stats.noise_lines,
        report.stats.decode_errors,
        report.stats.empty_lines
    );

    Ok(report)
}
