//! Configuration management for finmention
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::classify::{BackendKind, LocalModelConfig, RemoteConfig};
use crate::error::Error;
use crate::locator::DEFAULT_WINDOW;
use crate::report::ReportFormat;
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pipeline configuration
    pub analysis: AnalysisConfig,

    /// Local model configuration
    pub local: LocalModelConfig,

    /// Remote service configuration
    pub remote: RemoteConfig,

    /// Retry policy for remote calls
    pub retry: RetryConfig,

    /// Report output configuration
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Classification backend
    pub backend: BackendKind,

    /// Context characters kept on each side of a match
    pub window: usize,

    /// Maximum number of classification calls in flight
    pub max_concurrent: usize,

    /// Overall time budget for one entity's classification, retries included
    pub call_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Local,
            window: DEFAULT_WINDOW,
            max_concurrent: 4,
            call_timeout_secs: 300,
        }
    }
}

/// Report output configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format
    pub format: ReportFormat,

    /// Output file (stdout when unset)
    pub path: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = std::env::var("FINMENTION_BACKEND")
            .ok()
            .and_then(|v| BackendKind::from_str(&v, true).ok())
            .unwrap_or(defaults.analysis.backend);

        let window = std::env::var("FINMENTION_WINDOW")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.analysis.window);

        let max_concurrent = std::env::var("FINMENTION_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults.analysis.max_concurrent);

        let call_timeout_secs = std::env::var("FINMENTION_CALL_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.analysis.call_timeout_secs);

        let max_retries = std::env::var("FINMENTION_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.retry.max_retries);

        let output_format = std::env::var("FINMENTION_OUTPUT_FORMAT")
            .ok()
            .and_then(|v| ReportFormat::from_str(&v, true).ok())
            .unwrap_or(defaults.output.format);

        let output_path = std::env::var("FINMENTION_OUTPUT").ok().map(PathBuf::from);

        let log_level =
            std::env::var("FINMENTION_LOG_LEVEL").unwrap_or_else(|_| String::from("info"));

        let log_format = std::env::var("FINMENTION_LOG_FORMAT")
            .ok()
            .and_then(|v| LogFormat::from_str(&v, true).ok())
            .unwrap_or(defaults.logging.format);

        Ok(Self {
            analysis: AnalysisConfig {
                backend,
                window,
                max_concurrent,
                call_timeout_secs,
            },
            local: LocalModelConfig::from_env(),
            remote: RemoteConfig::from_env(),
            retry: RetryConfig {
                max_retries,
                ..defaults.retry
            },
            output: OutputConfig {
                format: output_format,
                path: output_path,
            },
            logging: LoggingConfig {
                level: log_level,
                format: log_format,
            },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise from the environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.analysis.max_concurrent == 0 {
            return Err(Error::config("max_concurrent must be greater than 0"));
        }

        if self.analysis.call_timeout_secs == 0 {
            return Err(Error::config("call_timeout_secs must be greater than 0"));
        }

        if self.remote.timeout_secs == 0 {
            return Err(Error::config("remote timeout_secs must be greater than 0"));
        }

        if !(0.0..=2.0).contains(&self.remote.temperature) {
            return Err(Error::config("remote temperature must be within [0, 2]"));
        }

        if self.remote.model.trim().is_empty() {
            return Err(Error::config("remote model must not be empty"));
        }

        if self.local.model_id.trim().is_empty() {
            return Err(Error::config("local model_id must not be empty"));
        }

        if self.local.max_seq_length == 0 {
            return Err(Error::config("local max_seq_length must be greater than 0"));
        }

        Ok(())
    }
}
