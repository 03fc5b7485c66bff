/*!
 * Integration tests for error classification and configuration
 *
 * Verifies:
 * - Exit codes per error kind
 * - Transient vs fatal classification
 * - Error categories used in logs
 * - Configuration file loading and validation
 */

use dataload::config::{LoaderConfig, LogLevel};
use dataload::error::{
    ErrorCategory, LoadError, EXIT_FATAL, EXIT_JOB_FAILED, EXIT_SUCCESS, EXIT_TIMEOUT,
};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_exit_codes_are_distinct() {
    let codes = [EXIT_SUCCESS, EXIT_JOB_FAILED, EXIT_FATAL, EXIT_TIMEOUT];
    for (i, a) in codes.iter().enumerate() {
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn test_failure_kinds_map_to_exit_codes() {
    let cases = vec![
        (
            LoadError::JobFailed {
                job_id: "job-1".to_string(),
                message: "bad data".to_string(),
            },
            EXIT_JOB_FAILED,
        ),
        (
            LoadError::Timeout {
                job_id: "job-1".to_string(),
                waited_secs: 60,
            },
            EXIT_TIMEOUT,
        ),
        (LoadError::InvalidMode("append".to_string()), EXIT_FATAL),
        (
            LoadError::SourceNotFound(PathBuf::from("missing.csv")),
            EXIT_FATAL,
        ),
        (LoadError::http_status(403, "Forbidden"), EXIT_FATAL),
        (
            LoadError::ContractViolation("No ETag".to_string()),
            EXIT_FATAL,
        ),
    ];

    for (err, code) in cases {
        assert_eq!(err.exit_code(), code, "{}", err);
    }
}

#[test]
fn test_contract_violation_is_not_transport() {
    let err = LoadError::ContractViolation("No ETag returned".to_string());
    assert_eq!(err.category(), ErrorCategory::Contract);
    assert!(!err.is_transient());

    let err = LoadError::http_status(502, "Bad Gateway");
    assert_eq!(err.category(), ErrorCategory::Transport);
    assert!(err.is_transient());
}

#[test]
fn test_timeout_is_distinct_from_job_failure() {
    let timeout = LoadError::Timeout {
        job_id: "job-7".to_string(),
        waited_secs: 30,
    };
    assert_eq!(timeout.category(), ErrorCategory::Timeout);
    assert!(timeout.to_string().contains("30 seconds"));

    let failed = LoadError::JobFailed {
        job_id: "job-7".to_string(),
        message: "quota exceeded".to_string(),
    };
    assert_eq!(failed.category(), ErrorCategory::Job);
    assert!(failed.to_string().contains("quota exceeded"));
}

#[test]
fn test_io_errors_classified_by_kind() {
    let reset: LoadError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
    assert!(reset.is_transient());
    assert_eq!(reset.category(), ErrorCategory::IoError);

    let denied: LoadError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
    assert!(!denied.is_transient());
}

#[test]
fn test_config_file_roundtrip_and_validation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataload.toml");

    let config = LoaderConfig {
        host: Some("https://api.example.com/rest".to_string()),
        target_part_size: 8 * 1024 * 1024,
        poll_interval_secs: 2,
        timeout_secs: Some(120),
        status_retries: 3,
        log_level: LogLevel::Debug,
        ..Default::default()
    };
    config.to_file(&path).unwrap();

    let loaded = LoaderConfig::from_file(&path).unwrap();
    assert!(loaded.validate().is_ok());
    assert_eq!(loaded.target_part_size, 8 * 1024 * 1024);
    assert_eq!(loaded.log_level, LogLevel::Debug);

    let settings = loaded.poll_settings();
    assert_eq!(settings.interval, Duration::from_secs(2));
    assert_eq!(settings.timeout, Some(Duration::from_secs(120)));
    assert_eq!(settings.status_retries, 3);
}

#[test]
fn test_malformed_config_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "target_part_size = \"large\"").unwrap();

    let err = LoaderConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, LoadError::Config(_)));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = LoaderConfig::from_file(std::path::Path::new("/no/such/dataload.toml")).unwrap_err();
    assert!(matches!(err, LoadError::Io(_)));
}
