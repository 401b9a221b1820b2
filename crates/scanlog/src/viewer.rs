//! Dashboard refresh cycle.
//!
//! Each cycle opens the database afresh, loads every reading newest-first
//! and renders a text dashboard: a summary, a polar plot of the latest scan
//! and the full history table. Failures are reported inline so the caller
//! can keep cycling.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::ViewerConfig;
use crate::error::Result;
use crate::reading::{Measurement, Reading};
use crate::render::{polar_plot, readings_table};
use crate::storage::{Storage, StorageStats};

const TITLE: &str = "Servo Scanner Dashboard";

/// Shown when the table holds no rows, or the database does not exist yet.
pub const NO_DATA_MESSAGE: &str = "No data found in database. Is scanlog running and connected?";

/// Shown in place of the plot when the latest scan has no valid distance.
pub const WAITING_MESSAGE: &str = "Waiting for valid scan data (distance >= 0) to plot...";

/// Snapshot of the database for one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    /// Every reading, newest first.
    pub readings: Vec<Reading>,
    /// Valid readings from the latest scan, newest first.
    pub latest: Vec<Reading>,
    /// Summary of the table.
    pub stats: StorageStats,
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    /// The table exists but holds no rows.
    Empty,
    /// Readings were loaded.
    Loaded(Dashboard),
    /// The database could not be opened or read.
    LoadFailed(String),
}

/// Polls the database and renders the dashboard.
#[derive(Debug, Clone)]
pub struct Viewer {
    database_path: PathBuf,
    config: ViewerConfig,
}

impl Viewer {
    /// Create a viewer over the database at `database_path`.
    pub fn new(database_path: impl Into<PathBuf>, config: ViewerConfig) -> Self {
        Self {
            database_path: database_path.into(),
            config,
        }
    }

    /// Path of the database being watched.
    #[must_use]
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    /// Time to wait between cycles.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        self.config.refresh_interval()
    }

    /// Load the current contents of the database.
    ///
    /// The database is opened read-side only: a missing file is an error,
    /// never created here. The summary is computed from the loaded rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or queried.
    pub fn load(&self) -> Result<(Vec<Reading>, StorageStats)> {
        let storage = Storage::open_existing(&self.database_path)?;
        let readings = storage.load_all()?;
        let stats = StorageStats::summarize(&readings, storage.file_size()?);
        storage.close()?;
        Ok((readings, stats))
    }

    /// Run one refresh cycle.
    #[must_use]
    pub fn refresh(&self) -> Refresh {
        match self.load() {
            Ok((readings, _)) if readings.is_empty() => {
                debug!("No readings in {}", self.database_path.display());
                Refresh::Empty
            }
            Ok((readings, stats)) => {
                let latest = latest_valid(&readings, self.config.latest_count);
                debug!(
                    "Loaded {} readings, {} plottable",
                    readings.len(),
                    latest.len()
                );
                Refresh::Loaded(Dashboard {
                    readings,
                    latest,
                    stats,
                })
            }
            Err(e) => {
                warn!("Error loading database: {e}");
                Refresh::LoadFailed(e.to_string())
            }
        }
    }

    /// Render a refresh outcome as dashboard text.
    #[must_use]
    pub fn render(&self, refresh: &Refresh) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{TITLE}");
        let _ = writeln!(out, "{}", "=".repeat(TITLE.len()));
        out.push('\n');

        match refresh {
            Refresh::Empty => {
                let _ = writeln!(out, "{NO_DATA_MESSAGE}");
            }
            Refresh::LoadFailed(message) => {
                let _ = writeln!(out, "Error loading database: {message}");
            }
            Refresh::Loaded(dashboard) => self.render_dashboard(&mut out, dashboard),
        }

        out.push('\n');
        let _ = writeln!(
            out,
            "Page auto-refreshes every {} seconds.",
            self.config.refresh_interval_secs
        );
        out
    }

    fn render_dashboard(&self, out: &mut String, dashboard: &Dashboard) {
        let stats = &dashboard.stats;
        let _ = writeln!(out, "Database: {}", self.database_path.display());
        let _ = writeln!(out, "Readings: {}", stats.total_readings);
        let _ = writeln!(out, "Size:     {} bytes", stats.db_size_bytes);
        if let (Some(oldest), Some(newest)) = (stats.oldest_reading, stats.newest_reading) {
            let _ = writeln!(
                out,
                "Span:     {} .. {}",
                oldest.format("%Y-%m-%d %H:%M:%S"),
                newest.format("%Y-%m-%d %H:%M:%S")
            );
        }
        out.push('\n');

        let heading = format!("Latest Scan Cycle ({} points)", self.config.latest_count);
        let _ = writeln!(out, "{heading}");
        let _ = writeln!(out, "{}", "-".repeat(heading.len()));
        if dashboard.latest.is_empty() {
            let _ = writeln!(out, "{WAITING_MESSAGE}");
        } else {
            let points: Vec<Measurement> =
                dashboard.latest.iter().map(Reading::measurement).collect();
            out.push_str(&polar_plot(
                &points,
                self.config.plot_width,
                self.config.plot_height,
            ));
        }
        out.push('\n');

        let heading = "All Historical Data";
        let _ = writeln!(out, "{heading}");
        let _ = writeln!(out, "{}", "-".repeat(heading.len()));
        out.push_str(&readings_table(&dashboard.readings));
    }
}

/// The newest `count` readings with a valid distance.
///
/// `readings` must be newest first. The window is taken before filtering, so
/// an invalid reading in the latest scan shrinks the result rather than
/// pulling in an older one.
#[must_use]
pub fn latest_valid(readings: &[Reading], count: usize) -> Vec<Reading> {
    readings
        .iter()
        .take(count)
        .filter(|r| r.is_valid())
        .cloned()
        .collect()
}
