//! Configuration management for scanlog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. A
//! single `Config` value is built at process start and passed down to the
//! logger, the store initializer and the viewer.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config dir.
const APP_DIR_NAME: &str = "scanlog";

/// Default database file, relative to the working directory.
const DATABASE_FILE_NAME: &str = "scan_data.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "SCANLOG_";

/// Serial port used when none is configured.
#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM5";

/// Serial port used when none is configured.
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Smallest plot dimension that still leaves room for axes and a point.
const MIN_PLOT_DIMENSION: usize = 5;

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SCANLOG_`, nested with `__`)
/// 2. TOML config file at `~/.config/scanlog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial stream configuration.
    pub serial: SerialConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Dashboard configuration.
    pub viewer: ViewerConfig,
}

/// Serial stream configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port identifier (e.g. `/dev/ttyUSB0` or `COM5`).
    pub port: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Read timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file shared by the logger and the viewer.
    pub database_path: PathBuf,
}

/// Dashboard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Seconds to wait between refresh cycles.
    pub refresh_interval_secs: u64,
    /// How many of the newest readings make up the latest scan.
    pub latest_count: usize,
    /// Polar plot width in characters.
    pub plot_width: usize,
    /// Polar plot height in lines.
    pub plot_height: usize,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: 115_200,
            timeout_ms: 1_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DATABASE_FILE_NAME),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
            latest_count: 4,
            plot_width: 41,
            plot_height: 21,
        }
    }
}

impl SerialConfig {
    /// Get the read timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ViewerConfig {
    /// Get the refresh interval as a Duration.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// A missing config file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        Self::load_with_port(config_path, None)
    }

    /// Load configuration, letting `port` (from the command line) override
    /// every other source of `serial.port`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_with_port(config_path: Option<PathBuf>, port: Option<String>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        if let Some(port) = port {
            figment = figment.merge(Serialized::default("serial.port", port));
        }

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(invalid("serial port must not be empty"));
        }
        if self.serial.baud_rate == 0 {
            return Err(invalid("baud_rate must be greater than 0"));
        }
        if self.serial.timeout_ms == 0 {
            return Err(invalid("timeout_ms must be greater than 0"));
        }
        if self.viewer.refresh_interval_secs == 0 {
            return Err(invalid("refresh_interval_secs must be greater than 0"));
        }
        if self.viewer.latest_count == 0 {
            return Err(invalid("latest_count must be greater than 0"));
        }
        if self.viewer.plot_width < MIN_PLOT_DIMENSION
            || self.viewer.plot_height < MIN_PLOT_DIMENSION
        {
            return Err(Error::ConfigValidation {
                message: format!(
                    "plot dimensions must be at least {MIN_PLOT_DIMENSION}x{MIN_PLOT_DIMENSION}, got {}x{}",
                    self.viewer.plot_width, self.viewer.plot_height
                ),
            });
        }
        Ok(())
    }

    /// Get the database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage.database_path.clone()
    }
}

fn invalid(message: &str) -> Error {
    Error::ConfigValidation {
        message: message.to_string(),
    }
}
