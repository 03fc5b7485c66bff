/*!
 * Backend capabilities used by the load and dump orchestrators
 *
 * Three narrow traits stand between the orchestration logic and the network:
 *
 * - [`UploadRegistry`]: reserves upload slots and completes multipart uploads
 * - [`JobService`]: submits jobs and reports their status
 * - [`FileTransfer`]: moves bytes to presigned URLs and downloads results
 *
 * [`http`] implements them over reqwest; `mock` provides recording doubles for tests.
 */

pub mod http;
pub mod types;

#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::error::Result;
use types::{CompleteMultipartRequest, JobDetail, JobKind, JobRequest, UploadSlot};

/// Upload bookkeeping on the backend
#[async_trait]
pub trait UploadRegistry: Send + Sync {
    /// Reserve an upload; `parts` requests that many presigned multipart URLs
    async fn initiate_upload(&self, project: &str, parts: Option<u32>) -> Result<UploadSlot>;

    /// Tell the backend every part is in place
    async fn complete_multipart(
        &self,
        project: &str,
        request: &CompleteMultipartRequest,
    ) -> Result<()>;
}

/// Job submission and status
#[async_trait]
pub trait JobService: Send + Sync {
    async fn submit_job(&self, request: &JobRequest) -> Result<JobDetail>;

    async fn job_status(&self, job_id: &str, kind: JobKind) -> Result<JobDetail>;
}

/// Outcome of a presigned PUT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutReceipt {
    pub status: u16,
    /// `ETag` response header, if the store sent one
    pub etag: Option<String>,
}

/// Raw byte movement against presigned or backend URLs
#[async_trait]
pub trait FileTransfer: Send + Sync {
    /// Stream a local file to a presigned URL
    async fn put_file(&self, url: &str, path: &Path, content_type: &str) -> Result<PutReceipt>;

    /// PUT an in-memory body to a presigned URL
    async fn put_bytes(&self, url: &str, body: Bytes, content_type: &str) -> Result<PutReceipt>;

    /// GET `url` (authenticated) and write the body to `dest`, returning bytes written
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}
