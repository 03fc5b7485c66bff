/*!
 * Core load and dump operations
 *
 * - [`splitter`]: row-aligned CSV part files
 * - [`uploader`]: presigned PUTs of whole files and gzip parts
 * - [`load`]: upload strategy, multipart bookkeeping and load jobs
 * - [`poller`]: waiting for jobs to reach a terminal status
 * - [`dump`]: dataset export and download
 */

pub mod dump;
pub mod load;
pub mod poller;
pub mod splitter;
pub mod uploader;


pub use dump::DataDumper;
pub use load::{DataLoader, LoadRequest, UploadStrategy};
pub use poller::{JobPoller, PollSettings, PollState};
pub use splitter::{CsvSplitter, Part};
pub use uploader::{IntegrityTag, PartUploader};
