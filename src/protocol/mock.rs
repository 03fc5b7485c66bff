//! Recording in-memory backend for tests
//!
//! `MockBackend` implements every backend capability at once. It hands out
//! predictable presigned URLs, records every call, and replays a scripted
//! sequence of job statuses.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, RwLock};

use super::types::{
    CompleteMultipartRequest, JobDetail, JobKind, JobRequest, JobResult, JobStatus, Link,
    UploadSlot,
};
use super::{FileTransfer, JobService, PutReceipt, UploadRegistry};
use crate::error::{LoadError, Result};

pub const STORE_BASE: &str = "https://store.test";

/// One PUT as seen by the object store
#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub url: String,
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
struct MockState {
    initiations: Vec<(String, Option<u32>)>,
    completions: Vec<(String, CompleteMultipartRequest)>,
    submissions: Vec<JobRequest>,
    puts: Vec<RecordedPut>,
    downloads: Vec<String>,
    status_fetches: u32,

    statuses: VecDeque<JobStatus>,
    failure_message: Option<String>,
    result_links: Vec<String>,
    downloadable: HashMap<String, Vec<u8>>,

    url_limit: Option<usize>,
    omit_self_link: bool,
    omit_upload_url: bool,
    omit_etag: bool,
    fail_put_url: Option<String>,
    failing_status_fetches: u32,
    fail_submit: bool,
}

/// In-memory backend recording every interaction
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<RwLock<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presigned URL handed out for a 1-based part number
    pub fn part_url(part_number: u32) -> String {
        format!("{}/parts/{}", STORE_BASE, part_number)
    }

    pub fn whole_url() -> String {
        format!("{}/whole", STORE_BASE)
    }

    // Scripting

    /// Statuses returned by successive `job_status` calls; the last one repeats
    pub fn script_statuses(&self, statuses: &[JobStatus]) {
        self.state.write().unwrap().statuses = statuses.iter().cloned().collect();
    }

    pub fn set_failure_message(&self, message: &str) {
        self.state.write().unwrap().failure_message = Some(message.to_string());
    }

    pub fn set_result_links(&self, links: &[&str]) {
        self.state.write().unwrap().result_links = links.iter().map(|l| l.to_string()).collect();
    }

    /// Serve `body` when `url` is downloaded
    pub fn serve(&self, url: &str, body: &[u8]) {
        self.state
            .write()
            .unwrap()
            .downloadable
            .insert(url.to_string(), body.to_vec());
    }

    /// Hand out at most `limit` multipart URLs regardless of the request
    pub fn limit_part_urls(&self, limit: usize) {
        self.state.write().unwrap().url_limit = Some(limit);
    }

    pub fn omit_self_link(&self) {
        self.state.write().unwrap().omit_self_link = true;
    }

    pub fn omit_upload_url(&self) {
        self.state.write().unwrap().omit_upload_url = true;
    }

    /// Accept PUTs without returning an `ETag`
    pub fn omit_etag(&self) {
        self.state.write().unwrap().omit_etag = true;
    }

    /// Answer PUTs to `url` with HTTP 500
    pub fn fail_put_to(&self, url: &str) {
        self.state.write().unwrap().fail_put_url = Some(url.to_string());
    }

    /// Fail the next `times` status fetches with a network error
    pub fn fail_status_fetches(&self, times: u32) {
        self.state.write().unwrap().failing_status_fetches = times;
    }

    pub fn fail_submit(&self) {
        self.state.write().unwrap().fail_submit = true;
    }

    // Inspection

    pub fn initiations(&self) -> Vec<(String, Option<u32>)> {
        self.state.read().unwrap().initiations.clone()
    }

    pub fn completions(&self) -> Vec<(String, CompleteMultipartRequest)> {
        self.state.read().unwrap().completions.clone()
    }

    pub fn submissions(&self) -> Vec<JobRequest> {
        self.state.read().unwrap().submissions.clone()
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.state.read().unwrap().puts.clone()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.state.read().unwrap().downloads.clone()
    }

    pub fn status_fetches(&self) -> u32 {
        self.state.read().unwrap().status_fetches
    }

    fn record_put(&self, url: &str, body: Vec<u8>, content_type: &str) -> Result<PutReceipt> {
        let mut state = self.state.write().unwrap();
        if state.fail_put_url.as_deref() == Some(url) {
            return Err(LoadError::http_status(
                500,
                format!("PUT {}: Internal Server Error", url),
            ));
        }

        state.puts.push(RecordedPut {
            url: url.to_string(),
            body,
            content_type: content_type.to_string(),
        });
        let etag = (!state.omit_etag).then(|| format!("\"etag-{}\"", state.puts.len()));
        Ok(PutReceipt { status: 200, etag })
    }
}

#[async_trait]
impl UploadRegistry for MockBackend {
    async fn initiate_upload(&self, project: &str, parts: Option<u32>) -> Result<UploadSlot> {
        let mut state = self.state.write().unwrap();
        state.initiations.push((project.to_string(), parts));

        let id = format!("up-{}", state.initiations.len());
        let links = if state.omit_self_link {
            Vec::new()
        } else {
            vec![Link {
                rel: Some("self".to_string()),
                href: format!("/rest/projects/{}/dwh/data/uploads/{}", project, id),
            }]
        };

        let slot = match parts {
            Some(n) => {
                let count = state.url_limit.map_or(n as usize, |l| l.min(n as usize));
                UploadSlot {
                    id,
                    upload_url: None,
                    upload_urls: (1..=count as u32).map(Self::part_url).collect(),
                    upload_id: Some("mp-1".to_string()),
                    links,
                }
            }
            None => UploadSlot {
                id,
                upload_url: (!state.omit_upload_url).then(Self::whole_url),
                upload_urls: Vec::new(),
                upload_id: None,
                links,
            },
        };
        Ok(slot)
    }

    async fn complete_multipart(
        &self,
        project: &str,
        request: &CompleteMultipartRequest,
    ) -> Result<()> {
        self.state
            .write()
            .unwrap()
            .completions
            .push((project.to_string(), request.clone()));
        Ok(())
    }
}

#[async_trait]
impl JobService for MockBackend {
    async fn submit_job(&self, request: &JobRequest) -> Result<JobDetail> {
        let mut state = self.state.write().unwrap();
        if state.fail_submit {
            return Err(LoadError::http_status(400, "POST /jobs: Bad Request"));
        }
        state.submissions.push(request.clone());
        Ok(JobDetail {
            id: format!("job-{}", state.submissions.len()),
            status: JobStatus::Pending,
            message: None,
            result: None,
        })
    }

    async fn job_status(&self, job_id: &str, _kind: JobKind) -> Result<JobDetail> {
        let mut state = self.state.write().unwrap();
        state.status_fetches += 1;

        if state.failing_status_fetches > 0 {
            state.failing_status_fetches -= 1;
            return Err(LoadError::network("connection reset by peer"));
        }

        let status = if state.statuses.len() > 1 {
            state.statuses.pop_front().unwrap_or(JobStatus::Running)
        } else {
            state.statuses.front().cloned().unwrap_or(JobStatus::Running)
        };

        let message = match status {
            JobStatus::Failed => state.failure_message.clone(),
            _ => None,
        };
        let result = (status == JobStatus::Succeeded && !state.result_links.is_empty()).then(|| {
            JobResult {
                links: state
                    .result_links
                    .iter()
                    .map(|href| Link {
                        rel: None,
                        href: href.clone(),
                    })
                    .collect(),
            }
        });

        Ok(JobDetail {
            id: job_id.to_string(),
            status,
            message,
            result,
        })
    }
}

#[async_trait]
impl FileTransfer for MockBackend {
    async fn put_file(&self, url: &str, path: &Path, content_type: &str) -> Result<PutReceipt> {
        let body = std::fs::read(path)?;
        self.record_put(url, body, content_type)
    }

    async fn put_bytes(&self, url: &str, body: Bytes, content_type: &str) -> Result<PutReceipt> {
        self.record_put(url, body.to_vec(), content_type)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let body = {
            let mut state = self.state.write().unwrap();
            state.downloads.push(url.to_string());
            state
                .downloadable
                .get(url)
                .cloned()
                .ok_or_else(|| LoadError::http_status(404, format!("GET {}: Not Found", url)))?
        };
        std::fs::write(dest, &body)?;
        Ok(body.len() as u64)
    }
}
