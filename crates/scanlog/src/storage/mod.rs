//! Storage layer for scanlog.
//!
//! This module provides `SQLite`-based persistent storage for readings. The
//! logger appends through one connection and the viewer reads through its
//! own; each insert autocommits so the viewer only ever sees whole rows.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::reading::{Measurement, Reading};

use self::schema::TIMESTAMP_FORMAT;

const SELECT_READINGS: &str = "SELECT id, timestamp, angle, distance_m FROM scans";

const MEMORY_PATH: &str = ":memory:";

/// Storage engine for readings.
///
/// The table is append-only from this crate's point of view: there is no
/// update, delete or pruning API.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Ensure the database at `path` exists with the current schema.
    ///
    /// Opens (creating the file and parent directories if needed),
    /// initializes the schema and closes again. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, created or written.
    pub fn initialize(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Initializing database at {}...", path.display());
        Self::open(path)?.close()?;
        info!("Database ready.");
        Ok(())
    }

    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist
    /// and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets the viewer read while the logger writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        debug!("Database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Open an existing database without creating or migrating it.
    ///
    /// Used by readers that must not leave an empty file behind when the
    /// logger has never run.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn =
            Connection::open_with_flags(&path, flags).map_err(|source| Error::DatabaseOpen {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(MEMORY_PATH),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(MEMORY_PATH),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file in bytes, 0 for an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata cannot be read.
    pub fn file_size(&self) -> Result<u64> {
        if self.path.as_os_str() == MEMORY_PATH {
            return Ok(0);
        }
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Append a measurement and return the id the store assigned.
    ///
    /// The insert commits before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, measurement: &Measurement) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO scans (angle, distance_m) VALUES (?1, ?2)",
            params![measurement.angle, measurement.distance_m],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted reading with id {}", id);
        Ok(id)
    }

    /// Load every reading, newest first.
    ///
    /// Rows inserted within the same second are ordered by id. Rows whose
    /// columns are NULL or whose timestamp does not parse are skipped with
    /// a warning, so one bad row never hides the rest of the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails (missing table, I/O).
    pub fn load_all(&self) -> Result<Vec<Reading>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_READINGS} ORDER BY timestamp DESC, id DESC"
        ))?;

        let mut readings = Vec::new();
        for row in stmt.query_map([], Self::row_to_reading)? {
            match row {
                Ok(reading) => readings.push(reading),
                Err(
                    e @ (rusqlite::Error::FromSqlConversionFailure(..)
                    | rusqlite::Error::InvalidColumnType(..)),
                ) => warn!("Skipping unreadable row: {}", e),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(readings)
    }

    /// Close the connection, reporting any error instead of swallowing it.
    ///
    /// # Errors
    ///
    /// Returns an error if `SQLite` fails to close the connection cleanly.
    pub fn close(self) -> Result<()> {
        let path = self.path;
        self.conn.close().map_err(|(_, e)| Error::from(e))?;
        debug!("Database connection to {} closed", path.display());
        Ok(())
    }

    /// Convert a database row to a Reading.
    fn row_to_reading(row: &rusqlite::Row) -> rusqlite::Result<Reading> {
        let timestamp_str: String = row.get(1)?;
        let timestamp = parse_timestamp(&timestamp_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        Ok(Reading {
            id: row.get(0)?,
            timestamp,
            angle: row.get(2)?,
            distance_m: row.get(3)?,
        })
    }
}

/// Parse a `CURRENT_TIMESTAMP` value (UTC).
fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map(|naive| naive.and_utc())
}

/// Summary of a set of loaded readings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of readings.
    pub total_readings: usize,
    /// Timestamp of the oldest reading.
    pub oldest_reading: Option<DateTime<Utc>>,
    /// Timestamp of the newest reading.
    pub newest_reading: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

impl StorageStats {
    /// Summarize `readings` as loaded by [`Storage::load_all`].
    ///
    /// Built from the rows themselves so the summary always agrees with the
    /// table it is shown next to.
    #[must_use]
    pub fn summarize(readings: &[Reading], db_size_bytes: u64) -> Self {
        Self {
            total_readings: readings.len(),
            oldest_reading: readings.iter().map(|r| r.timestamp).min(),
            newest_reading: readings.iter().map(|r| r.timestamp).max(),
            db_size_bytes,
        }
    }
}
