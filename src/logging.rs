/*!
 * Logging setup
 *
 * Human-readable lines go to stderr so stdout stays free for job ids and
 * paths. With a log file configured, events are written there as JSON lines
 * instead. `RUST_LOG` overrides the configured level.
 */

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};

/// Resolve the effective level: `verbose` wins over the configured level
pub fn effective_level(config: &LoaderConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

fn filter_for(level: Level) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("dataload={}", level)))
        .map_err(|e| LoadError::Config(format!("Invalid log filter: {}", e)))
}

fn open_log_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| {
        LoadError::Config(format!("Cannot open log file {}: {}", path.display(), e))
    })
}

/// Install the global subscriber for this process
pub fn init_logging(config: &LoaderConfig) -> Result<()> {
    let filter = filter_for(effective_level(config))?;
    let log_file = config.log_file.as_deref().map(open_log_file).transpose()?;

    let (stderr_layer, json_layer) = match log_file {
        Some(file) => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_current_span(false),
            ),
        ),
        None => (
            Some(fmt::layer().compact().with_writer(std::io::stderr)),
            None,
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| LoadError::Config(format!("Logging already initialized: {}", e)))
}

/// Route log output through the test harness; repeated calls are ignored
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("dataload=debug"))
        .with_test_writer()
        .try_init();
}
