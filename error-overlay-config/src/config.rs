//! Overlay configuration: types, YAML persistence, and validation.
//!
//! Covers:
//! - `OverlayConfig` and its nested sections (`FetchConfig`, `ExcerptConfig`)
//! - `load_from` / `save_to` (YAML file I/O with atomic write)
//! - XDG-style default path helpers (`config_path`, `config_dir`)
//! - `validate` for semantic checks the YAML schema cannot express

use crate::defaults;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log level for the overlay's debug log file.
///
/// The `--log-level` CLI flag and `RUST_LOG` take precedence over this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// No logging (log file not created)
    Off,
    /// Errors only
    Error,
    /// Warnings and errors
    #[default]
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Most verbose
    Trace,
}

impl LogLevel {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Settings for fetching script and source-map artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Global timeout for one fetch, in seconds (default: 10)
    #[serde(default = "defaults::fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum accepted response size in bytes (default: 10 MB)
    #[serde(default = "defaults::max_body_bytes")]
    pub max_body_bytes: u64,

    /// Allow plain `http://` URLs (default: true; dev servers rarely use TLS)
    #[serde(default = "defaults::bool_true")]
    pub allow_http: bool,

    /// Allow `file://` URLs, read straight from disk (default: true)
    #[serde(default = "defaults::bool_true")]
    pub allow_file: bool,

    /// `User-Agent` header sent with every request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::fetch_timeout_secs(),
            max_body_bytes: defaults::max_body_bytes(),
            allow_http: true,
            allow_file: true,
            user_agent: defaults::user_agent(),
        }
    }
}

/// Window of source lines shown around a frame's line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExcerptConfig {
    /// Lines shown before the highlighted line (default: 4)
    #[serde(default = "defaults::excerpt_context_before")]
    pub context_before: usize,

    /// Lines shown after the highlighted line (default: 4)
    #[serde(default = "defaults::excerpt_context_after")]
    pub context_after: usize,
}

impl Default for ExcerptConfig {
    fn default() -> Self {
        Self {
            context_before: defaults::excerpt_context_before(),
            context_after: defaults::excerpt_context_after(),
        }
    }
}

/// Top-level overlay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayConfig {
    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub excerpt: ExcerptConfig,

    /// Start with compiled (as-delivered) locations instead of original ones
    #[serde(default = "defaults::bool_false")]
    pub start_compiled: bool,

    /// Install the panic-hook ambient failure source when the overlay mounts
    #[serde(default = "defaults::bool_true")]
    pub capture_panics: bool,

    /// Debug log verbosity; `None` defers to the CLI flag and environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            excerpt: ExcerptConfig::default(),
            start_compiled: false,
            capture_panics: true,
            log_level: None,
        }
    }
}

impl OverlayConfig {
    /// Parse a configuration from YAML text and validate it.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: OverlayConfig = serde_yaml_ng::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }

        log::info!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path)
            .map_err(ConfigError::from)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        let config = Self::from_yaml_str(&contents)
            .with_context(|| format!("Invalid config file {path:?}"))?;
        Ok(config)
    }

    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(ConfigError::from)?;
        }

        let yaml = serde_yaml_ng::to_string(self).map_err(ConfigError::from)?;

        // Atomic save: write to temp file then rename to prevent corruption on crash
        let temp_path = path.with_extension("yaml.tmp");
        fs::write(&temp_path, &yaml).map_err(ConfigError::from)?;
        fs::rename(&temp_path, path).map_err(ConfigError::from)?;

        log::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check field values the YAML schema cannot constrain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fetch.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigError::Validation(
                "fetch.max_body_bytes must be greater than 0".to_string(),
            ));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "fetch.user_agent must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the configuration directory path (using XDG convention)
    pub fn config_dir() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            if let Some(config_dir) = dirs::config_dir() {
                config_dir.join("error-overlay")
            } else {
                PathBuf::from(".")
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Some(home_dir) = dirs::home_dir() {
                home_dir.join(".config").join("error-overlay")
            } else {
                PathBuf::from(".")
            }
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }
}
