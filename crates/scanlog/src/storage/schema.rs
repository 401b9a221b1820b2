//! `SQLite` schema definitions for scanlog.

/// SQL statement to create the scans table.
///
/// `id` and `timestamp` are filled in by `SQLite`; writers only supply the
/// angle and distance.
pub const CREATE_SCANS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
    angle INTEGER,
    distance_m REAL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_SCANS_TABLE];

/// Format of `CURRENT_TIMESTAMP` values.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
