//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/healthlog/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/healthlog/` (~/.config/healthlog/)
//! - Data: `$XDG_DATA_HOME/healthlog/` (~/.local/share/healthlog/)
//! - State/Logs: `$XDG_STATE_HOME/healthlog/` (~/.local/state/healthlog/)
//!
//! ```toml
//! [timezone]
//! utc_offset = "+02:00"
//!
//! [analytics]
//! window_days = 30
//! min_entries = 5
//! max_results = 5
//! disabled_analyzers = ["core.nutrition"]
//!
//! [logging]
//! level = "debug"
//!
//! [storage]
//! database_path = "/srv/healthlog/data.db"
//! ```

use crate::analytics::{DEFAULT_MIN_ENTRIES, DEFAULT_WINDOW_DAYS};
use crate::datekey::DateKeyer;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "healthlog";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Day boundary configuration
    #[serde(default)]
    pub timezone: TimezoneConfig,

    /// Insight generation configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Storage location overrides
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Offset that decides which calendar day an entry belongs to
#[derive(Debug, Deserialize)]
pub struct TimezoneConfig {
    /// `+HH:MM`, `-HH:MM` or `Z`
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

/// Insight engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Days of history before the as-of date
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Entries some category needs before non-fallback analyzers run
    #[serde(default = "default_min_entries")]
    pub min_entries: usize,

    /// Cap on returned insights (unbounded when absent)
    #[serde(default)]
    pub max_results: Option<usize>,

    /// List of disabled analyzers
    #[serde(default)]
    pub disabled_analyzers: Vec<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            min_entries: default_min_entries(),
            max_results: None,
            disabled_analyzers: vec![],
        }
    }
}

fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}

fn default_min_entries() -> usize {
    DEFAULT_MIN_ENTRIES
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Storage configuration
#[derive(Debug, Deserialize, Default)]
pub struct StorageConfig {
    /// Override for the SQLite database file
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.keyer()?;
        if self.analytics.min_entries == 0 {
            return Err(Error::Config(
                "analytics.min_entries must be at least 1".to_string(),
            ));
        }
        if self.logging.max_files == 0 {
            return Err(Error::Config(
                "logging.max_files must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Day-key normalizer for the configured offset
    pub fn keyer(&self) -> Result<DateKeyer> {
        DateKeyer::from_offset_str(&self.timezone.utc_offset)
    }

    /// Database file, honoring `storage.database_path`
    pub fn resolved_database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(Self::database_path)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/healthlog/config.toml` (~/.config/healthlog/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/healthlog/` (~/.local/share/healthlog/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join(APP_DIR)
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/healthlog/` (~/.local/state/healthlog/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/healthlog/data.db` (~/.local/share/healthlog/data.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("data.db")
    }

    /// Returns the log file path prefix
    ///
    /// `$XDG_STATE_HOME/healthlog/healthlog.log` (~/.local/state/healthlog/healthlog.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("healthlog.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// For CLI binaries that want stable path behavior before invoking
    /// other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
