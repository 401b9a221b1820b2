//! Error types for scanlog.
//!
//! This module defines all error types used throughout the scanlog crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for scanlog operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to bring the schema to the supported version.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Serial Errors ===
    /// The serial port could not be opened.
    #[error("could not open port {port}: {source}")]
    PortOpen {
        /// Port identifier that was requested.
        port: String,
        /// The underlying error.
        #[source]
        source: serialport::Error,
    },

    /// The serial stream went away during a read.
    #[error("serial port {port} disconnected: {source}")]
    Disconnected {
        /// Port identifier of the stream.
        port: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for scanlog operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a disconnect error for the given port.
    #[must_use]
    pub fn disconnected(port: impl Into<String>, source: std::io::Error) -> Self {
        Self::Disconnected {
            port: port.into(),
            source,
        }
    }

    /// Check if this error means the serial stream is gone.
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }

    /// Check if this error came from opening the serial port.
    #[must_use]
    pub fn is_port_open(&self) -> bool {
        matches!(self, Self::PortOpen { .. })
    }
}
