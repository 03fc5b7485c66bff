/*!
 * Error types for dataload
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_JOB_FAILED: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_TIMEOUT: i32 = 3;

#[derive(Error, Debug)]
pub enum LoadError {
    /// Load mode other than `full` or `incremental`
    #[error("Invalid data loading mode '{0}': must be 'full' or 'incremental'")]
    InvalidMode(String),

    /// Local source file does not exist
    #[error("CSV file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Caller supplied an unusable argument
    #[error("Validation error: {0}")]
    Validation(String),

    /// Component used out of order (e.g. splitting before acquiring a work dir)
    #[error("Usage error: {0}")]
    Usage(String),

    /// Backend or object store response is missing something it must carry
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Non-success HTTP status or network failure
    #[error("Transport error{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },

    /// Backend reported the job as FAILED
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    /// Poller gave up before the job reached a terminal status
    #[error("Job {job_id} did not complete within {waited_secs} seconds")]
    Timeout { job_id: String, waited_secs: u64 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// Request or response body could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LoadError {
    /// Shorthand for a transport failure carrying an HTTP status
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        LoadError::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Shorthand for a transport failure without a response
    pub fn network(message: impl Into<String>) -> Self {
        LoadError::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::JobFailed { .. } => EXIT_JOB_FAILED,
            LoadError::Timeout { .. } => EXIT_TIMEOUT,
            _ => EXIT_FATAL,
        }
    }

    /// Check if this error is transient (temporary, worth retrying)
    ///
    /// Nothing in the upload path retries; this only feeds the opt-in
    /// status-fetch retry of the job poller.
    pub fn is_transient(&self) -> bool {
        match self {
            LoadError::Transport { status: None, .. } => true,
            LoadError::Transport {
                status: Some(code), ..
            } => matches!(code, 408 | 429 | 500 | 502 | 503 | 504),
            LoadError::Io(io_err) => Self::is_io_transient(io_err),
            _ => false,
        }
    }

    fn is_io_transient(io_err: &io::Error) -> bool {
        use io::ErrorKind::*;
        matches!(
            io_err.kind(),
            ConnectionRefused
                | ConnectionReset
                | ConnectionAborted
                | NotConnected
                | BrokenPipe
                | TimedOut
                | Interrupted
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            LoadError::InvalidMode(_)
            | LoadError::SourceNotFound(_)
            | LoadError::Validation(_)
            | LoadError::Usage(_) => ErrorCategory::Validation,
            LoadError::ContractViolation(_) => ErrorCategory::Contract,
            LoadError::Transport { .. } => ErrorCategory::Transport,
            LoadError::JobFailed { .. } => ErrorCategory::Job,
            LoadError::Timeout { .. } => ErrorCategory::Timeout,
            LoadError::Io(_) => ErrorCategory::IoError,
            LoadError::Config(_) => ErrorCategory::Configuration,
            LoadError::Compression(_) => ErrorCategory::Codec,
            LoadError::Serialization(_) => ErrorCategory::Codec,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad caller input, rejected before any network call
    Validation,
    /// Backend response missing a required link, URL or tag
    Contract,
    /// HTTP or network failure
    Transport,
    /// Job reached FAILED
    Job,
    /// Poller timed out
    Timeout,
    /// Local I/O
    IoError,
    /// Configuration errors
    Configuration,
    /// Compression and (de)serialization
    Codec,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Contract => write!(f, "contract"),
            ErrorCategory::Transport => write!(f, "transport"),
            ErrorCategory::Job => write!(f, "job"),
            ErrorCategory::Timeout => write!(f, "timeout"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Codec => write!(f, "codec"),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for LoadError {
    fn from(err: toml::de::Error) -> Self {
        LoadError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for LoadError {
    fn from(err: toml::ser::Error) -> Self {
        LoadError::Config(format!("TOML write error: {}", err))
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LoadError::http_status(status.as_u16(), err.to_string()),
            None => LoadError::network(err.to_string()),
        }
    }
}
