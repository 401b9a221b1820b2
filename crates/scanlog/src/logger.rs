//! The serial logging loop.
//!
//! [`Session::connect`] starts in `Connecting` and either yields a
//! `Streaming` session or ends `Failed` with the store released. A
//! [`Session`] owns one open stream and one store connection and moves from
//! `Streaming` into either `Closed` (user interrupt) or `Failed`
//! (disconnect or store failure). Whichever way it ends, [`Session::run`]
//! drops the stream and closes the store before returning.
//!
//! Lines that fail to decode or parse are logged and skipped; they never
//! produce a row and never stop the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::parser::parse_line;
use crate::reading::Measurement;
use crate::source::{LineSource, ReadEvent};
use crate::storage::Storage;

/// Lifecycle of a logging run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerState {
    /// Opening the serial stream.
    Connecting,
    /// Reading and recording lines.
    Streaming,
    /// Stopped by the user.
    Closed,
    /// Stopped by a stream or store failure.
    Failed,
}

impl std::fmt::Display for LoggerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Streaming => write!(f, "streaming"),
            Self::Closed => write!(f, "closed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A cloneable handle used to interrupt a running session.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stop_signal: Arc<AtomicBool>,
}

impl StopHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the session to stop before its next read.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if a stop has been requested.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

/// Where accepted measurements go.
pub trait ReadingSink {
    /// Persist one measurement and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the measurement could not be committed.
    fn append(&mut self, measurement: &Measurement) -> Result<i64>;

    /// Release the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying resource did not close cleanly.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

impl ReadingSink for Storage {
    fn append(&mut self, measurement: &Measurement) -> Result<i64> {
        self.insert(measurement)
    }

    fn close(self) -> Result<()> {
        Storage::close(self)
    }
}

/// What one read step did.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// The read timed out with no complete line.
    Idle,
    /// The line was blank after trimming.
    Empty,
    /// The line was not valid UTF-8.
    DecodeError,
    /// The line did not carry a measurement.
    Noise(String),
    /// A measurement was stored under `id`.
    Logged {
        /// Id assigned by the store.
        id: i64,
        /// The stored values.
        measurement: Measurement,
    },
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user asked to stop.
    Interrupted,
    /// The stream went away.
    Disconnected {
        /// Description of the stream failure.
        message: String,
    },
    /// A measurement could not be written.
    StoreFailed {
        /// Description of the store failure.
        message: String,
    },
}

impl SessionEnd {
    /// The terminal state this end maps to.
    #[must_use]
    pub fn state(&self) -> LoggerState {
        match self {
            Self::Interrupted => LoggerState::Closed,
            Self::Disconnected { .. } | Self::StoreFailed { .. } => LoggerState::Failed,
        }
    }
}

/// Counters kept over a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Lines stored as readings.
    pub readings_logged: u64,
    /// Lines that did not match the measurement pattern.
    pub noise_lines: u64,
    /// Lines that were not valid UTF-8.
    pub decode_errors: u64,
    /// Blank lines.
    pub empty_lines: u64,
}

/// Outcome of [`Session::run`].
#[derive(Debug)]
pub struct SessionReport {
    /// Why the session ended.
    pub end: SessionEnd,
    /// Terminal state, `Closed` or `Failed`.
    pub state: LoggerState,
    /// Line counters.
    pub stats: SessionStats,
    /// Error raised while closing the store, if any.
    pub release_error: Option<String>,
}

/// A connection attempt that never reached `Streaming`.
#[derive(Debug)]
pub struct ConnectFailure {
    /// Why the stream could not be opened.
    pub error: Error,
    /// Terminal state, always `Failed`.
    pub state: LoggerState,
    /// Error raised while closing the store, if any.
    pub release_error: Option<String>,
}

/// How a logging run ended: a finished session or a failed connection.
pub type RunOutcome = std::result::Result<SessionReport, ConnectFailure>;

/// Process exit status for a logging run.
///
/// A run that never connected exits 1. Once streaming started the run exits
/// 0, whether it was interrupted, lost the stream or failed to write.
#[must_use]
pub fn exit_status(outcome: &RunOutcome) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// One streaming run over an open source and sink.
#[derive(Debug)]
pub struct Session<S, K> {
    source: S,
    sink: K,
    state: LoggerState,
    stats: SessionStats,
}

impl<S: LineSource, K: ReadingSink> Session<S, K> {
    /// Open the stream with `open` and start a session over it and `sink`.
    ///
    /// # Errors
    ///
    /// If `open` fails the sink is closed and a [`ConnectFailure`] in state
    /// `Failed` is returned.
    pub fn connect<F>(open: F, sink: K) -> std::result::Result<Self, ConnectFailure>
    where
        F: FnOnce() -> Result<S>,
    {
        debug!("Logger state: {}", LoggerState::Connecting);
        match open() {
            Ok(source) => Ok(Self::new(source, sink)),
            Err(error) => {
                error!("Error: {}", error);
                if error.is_port_open() {
                    error!("Please check your port name and ensure the device is connected.");
                }
                let release_error = sink.close().err().map(|e| {
                    warn!("Failed to close database connection: {}", e);
                    e.to_string()
                });
                debug!("Logger state: {}", LoggerState::Failed);
                Err(ConnectFailure {
                    error,
                    state: LoggerState::Failed,
                    release_error,
                })
            }
        }
    }

    /// Start streaming from an already-open source into a sink.
    pub fn new(source: S, sink: K) -> Self {
        info!("Connected to {}. Waiting for data...", source.name());
        Self {
            source,
            sink,
            state: LoggerState::Streaming,
            stats: SessionStats::default(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LoggerState {
        self.state
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Perform one read and handle whatever it produced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnected`] if the stream is gone, or a storage
    /// error if an accepted measurement could not be written. Decode and
    /// parse failures are not errors.
    pub fn step(&mut self) -> Result<LineEvent> {
        let bytes = match self.source.read_line()? {
            ReadEvent::Timeout => return Ok(LineEvent::Idle),
            ReadEvent::Line(bytes) => bytes,
        };

        let Ok(text) = std::str::from_utf8(&bytes) else {
            self.stats.decode_errors += 1;
            warn!("Serial (Decode Error): Skipping malformed line.");
            return Ok(LineEvent::DecodeError);
        };

        let line = text.trim();
        if line.is_empty() {
            self.stats.empty_lines += 1;
            return Ok(LineEvent::Empty);
        }

        match parse_line(line).measurement() {
            Some(measurement) => {
                let id = self.sink.append(&measurement)?;
                self.stats.readings_logged += 1;
                info!(
                    "Logged: Angle={} deg, Distance={} m",
                    measurement.angle, measurement.distance_m
                );
                Ok(LineEvent::Logged { id, measurement })
            }
            None => {
                self.stats.noise_lines += 1;
                info!("Serial (Noise): {}", line);
                Ok(LineEvent::Noise(line.to_string()))
            }
        }
    }

    /// Stream until interrupted or until the stream or store fails, then
    /// release both.
    #[must_use]
    pub fn run(mut self, stop: &StopHandle) -> SessionReport {
        let end = loop {
            if stop.should_stop() {
                info!("Logging stopped by user.");
                break SessionEnd::Interrupted;
            }
            match self.step() {
                Ok(event) => debug!("{:?}", event),
                Err(e) if e.is_disconnect() => {
                    error!("Error: Serial port disconnected. {}", e);
                    break SessionEnd::Disconnected {
                        message: e.to_string(),
                    };
                }
                Err(e) => {
                    error!("Error: could not record reading. {}", e);
                    break SessionEnd::StoreFailed {
                        message: e.to_string(),
                    };
                }
            }
        };

        self.state = end.state();
        let state = self.state;
        let Self {
            source,
            sink,
            stats,
            ..
        } = self;

        let name = source.name().to_string();
        drop(source);
        let release_error = match sink.close() {
            Ok(()) => None,
            Err(e) => {
                warn!("Failed to close database connection: {}", e);
                Some(e.to_string())
            }
        };
        info!("Serial port {} closed. Database connection closed.", name);

        SessionReport {
            end,
            state,
            stats,
            release_error,
        }
    }
}
