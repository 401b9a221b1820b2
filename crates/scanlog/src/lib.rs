//! `scanlog` - Record and view servo scanner distance readings
//!
//! The logger reads `Angle: <deg> | Distance: <m> m.` lines from a serial
//! device and appends each reading to a `SQLite` table. The viewer polls the
//! same table and renders a text dashboard.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod logging;
pub mod parser;
pub mod reading;
pub mod render;
pub mod source;
pub mod storage;
pub mod viewer;

pub use config::Config;
pub use error::{Error, Result};
pub use logger::{
    exit_status, ConnectFailure, LoggerState, ReadingSink, RunOutcome, Session, SessionEnd,
    SessionReport, StopHandle,
};
pub use logging::init_logging;
pub use parser::{parse_line, LineParser, ParseOutcome};
pub use reading::{Measurement, Reading};
pub use source::{open_serial, LineSource, ReadEvent, StreamLineSource};
pub use storage::{Storage, StorageStats};
pub use viewer::{Refresh, Viewer};
