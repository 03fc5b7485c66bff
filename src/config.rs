/*!
 * Configuration types for dataload
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::poller::PollSettings;
use crate::error::{LoadError, Result};

/// Default content type for CSV uploads
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Main configuration for load and dump operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Backend base address, e.g. `https://host/rest`
    #[serde(default)]
    pub host: Option<String>,

    /// Files up to this many bytes are uploaded in a single PUT
    #[serde(default = "default_single_part_threshold")]
    pub single_part_threshold: u64,

    /// Target size of one multipart part; also the splitter's byte budget
    #[serde(default = "default_target_part_size")]
    pub target_part_size: u64,

    /// Gzip multipart parts before upload
    #[serde(default = "default_true")]
    pub compress_parts: bool,

    /// Content-Type header for presigned PUTs
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Seconds between job status checks
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum seconds to wait for a job (None = wait forever)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Retries of a transient status-fetch failure while polling (0 = fail fast)
    #[serde(default)]
    pub status_retries: u32,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Path prefix the backend puts in front of result links
    #[serde(default = "default_result_link_prefix")]
    pub result_link_prefix: String,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            host: None,
            single_part_threshold: default_single_part_threshold(),
            target_part_size: default_target_part_size(),
            compress_parts: true,
            content_type: default_content_type(),
            poll_interval_secs: default_poll_interval(),
            timeout_secs: None,
            status_retries: 0,
            request_timeout_secs: default_request_timeout(),
            result_link_prefix: default_result_link_prefix(),
            log_level: LogLevel::default(),
            log_file: None,
            verbose: false,
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_single_part_threshold() -> u64 {
    50 * 1024 * 1024 // 50 MiB
}

fn default_target_part_size() -> u64 {
    20 * 1024 * 1024 // 20 MiB
}

fn default_content_type() -> String {
    CSV_CONTENT_TYPE.to_string()
}

fn default_poll_interval() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    300 // 5 minutes
}

fn default_result_link_prefix() -> String {
    "/rest".to_string()
}

impl LoaderConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: LoaderConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.single_part_threshold == 0 {
            return Err(LoadError::Config(
                "single_part_threshold must be greater than 0".to_string(),
            ));
        }

        if self.target_part_size == 0 {
            return Err(LoadError::Config(
                "target_part_size must be greater than 0".to_string(),
            ));
        }

        if self.content_type.trim().is_empty() {
            return Err(LoadError::Config("content_type cannot be empty".to_string()));
        }

        if let Some(host) = &self.host {
            url::Url::parse(host)
                .map_err(|e| LoadError::Config(format!("Invalid host '{}': {}", host, e)))?;
        }

        Ok(())
    }

    /// The backend base address, required by the HTTP adapters
    pub fn require_host(&self) -> Result<&str> {
        self.host
            .as_deref()
            .ok_or_else(|| LoadError::Config("API host is not configured".to_string()))
    }

    /// Poller settings derived from this configuration
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            timeout: self.timeout_secs.map(Duration::from_secs),
            status_retries: self.status_retries,
        }
    }
}
