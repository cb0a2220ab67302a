//! Configuration file loading with precedence handling.

use crate::view_state::RowMetrics;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SNAPVIEW_CONFIG";

/// Environment variable overriding the log file path.
pub const LOG_FILE_ENV_VAR: &str = "SNAPVIEW_LOG_FILE";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// A value parses but cannot be used.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Offending key.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/snapview/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Height of a leaf row in pixels.
    #[serde(default)]
    pub row_height: Option<usize>,

    /// Height of a group header row in pixels.
    #[serde(default)]
    pub header_row_height: Option<usize>,

    /// Delay between a filter edit and the rebuild, in milliseconds.
    #[serde(default)]
    pub filter_debounce_ms: Option<u64>,

    /// Show size columns as KB/MB/GB instead of raw byte counts.
    #[serde(default)]
    pub human_readable_sizes: Option<bool>,

    /// Rows printed by the `show` and `diff` commands.
    #[serde(default)]
    pub max_rows: Option<usize>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Leaf row height.
    pub row_height: usize,
    /// Group header row height.
    pub header_row_height: usize,
    /// Filter debounce in milliseconds.
    pub filter_debounce_ms: u64,
    /// Human-readable size formatting.
    pub human_readable_sizes: bool,
    /// Rows printed per table.
    pub max_rows: usize,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let metrics = RowMetrics::default();
        Self {
            row_height: metrics.row_height,
            header_row_height: metrics.header_row_height,
            filter_debounce_ms: 150,
            human_readable_sizes: true,
            max_rows: 50,
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Row height function for view states.
    pub fn row_metrics(&self) -> RowMetrics {
        RowMetrics {
            row_height: self.row_height,
            header_row_height: self.header_row_height,
        }
    }

    /// Filter debounce interval.
    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(self.filter_debounce_ms)
    }

    /// Reject settings the view layer cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for zero row heights.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.row_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "row_height",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.header_row_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "header_row_height",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/snapview/snapview.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    match dirs::state_dir() {
        Some(state_dir) => state_dir.join("snapview").join("snapview.log"),
        None => PathBuf::from("snapview.log"),
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/snapview/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("snapview").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `SNAPVIEW_CONFIG` environment variable
/// 3. Default path `~/.config/snapview/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        return load_config_file(PathBuf::from(env_path));
    }

    match default_config_path() {
        Some(default_path) => load_config_file(default_path),
        None => Ok(None),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for `SNAPVIEW_LOG_FILE`, overriding the log file path.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(path) = std::env::var(LOG_FILE_ENV_VAR) {
        if !path.is_empty() {
            config.log_file_path = PathBuf::from(path);
        }
    }
    config
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        row_height: config.row_height.unwrap_or(defaults.row_height),
        header_row_height: config
            .header_row_height
            .unwrap_or(defaults.header_row_height),
        filter_debounce_ms: config
            .filter_debounce_ms
            .unwrap_or(defaults.filter_debounce_ms),
        human_readable_sizes: config
            .human_readable_sizes
            .unwrap_or(defaults.human_readable_sizes),
        max_rows: config.max_rows.unwrap_or(defaults.max_rows),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Settings given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--log-file`
    pub log_file_path: Option<PathBuf>,
    /// `--raw-sizes` (stored inverted)
    pub human_readable_sizes: Option<bool>,
    /// `--rows`
    pub max_rows: Option<usize>,
}

/// Apply CLI argument overrides to resolved config.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, cli: CliOverrides) -> ResolvedConfig {
    if let Some(path) = cli.log_file_path {
        config.log_file_path = path;
    }
    if let Some(human) = cli.human_readable_sizes {
        config.human_readable_sizes = human;
    }
    if let Some(rows) = cli.max_rows {
        config.max_rows = rows;
    }
    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
