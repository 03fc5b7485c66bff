/*!
 * dataload - CSV loading and dataset export client
 *
 * Moves local CSV files into a data warehouse through presigned object-store
 * uploads and backend jobs:
 * - Single-part upload for small files
 * - Row-aligned multipart upload for large files, with gzip parts
 * - Load job submission with optional waiting
 * - Dataset dumps downloaded back to local CSV files
 */

pub mod compression;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod protocol;

// Re-export commonly used types
pub use config::{LoaderConfig, LogLevel};
pub use core::{CsvSplitter, DataDumper, DataLoader, JobPoller, LoadRequest, PollSettings};
pub use error::{LoadError, Result};
pub use protocol::types::{CsvOptions, JobDetail, JobKind, JobStatus, LoadMode};
pub use protocol::{FileTransfer, JobService, UploadRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
