//! reqwest-backed implementations of the backend capabilities
//!
//! Only the HTTP method, a redacted path and the status code are logged.
//! Presigned URLs carry credentials in their query string and the bearer
//! token never leaves the `Authorization` header.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use url::Url;

use super::types::{CompleteMultipartRequest, JobDetail, JobKind, JobRequest, UploadSlot};
use super::{FileTransfer, JobService, PutReceipt, UploadRegistry};
use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};

/// Authenticated client for the backend REST API
#[derive(Clone)]
pub struct ApiClient {
    client: Arc<Client>,
    base_url: String,
    token: SecretString,
}

impl ApiClient {
    /// Build a client for `host` (e.g. `https://api.example.com/rest`)
    pub fn new(host: &str, token: SecretString, request_timeout: Duration) -> Result<Self> {
        Url::parse(host)
            .map_err(|e| LoadError::Config(format!("Invalid host '{}': {}", host, e)))?;

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| LoadError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: host.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn from_config(config: &LoaderConfig, token: SecretString) -> Result<Self> {
        Self::new(
            config.require_host()?,
            token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Base address with any trailing slash removed
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Byte transfer sharing this client's connection pool and credentials
    pub fn transfer(&self) -> HttpTransfer {
        HttpTransfer {
            client: Arc::clone(&self.client),
            token: Some(self.token.clone()),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| LoadError::Config(format!("Failed to build URL: {}", e)))
    }

    fn uploads_url(&self, project: &str, parts: Option<u32>) -> Result<Url> {
        let mut url = self.endpoint(&format!("/projects/{}/dwh/data/uploads", project))?;
        if let Some(parts) = parts {
            url.query_pairs_mut()
                .append_pair("parts", &parts.to_string());
        }
        Ok(url)
    }

    fn complete_url(&self, project: &str, upload_id: &str) -> Result<Url> {
        self.endpoint(&format!(
            "/projects/{}/dwh/data/uploads/{}/complete",
            project, upload_id
        ))
    }

    fn job_url(&self, job_id: &str, kind: JobKind) -> Result<Url> {
        let mut url = self.endpoint(&format!("/jobs/{}", job_id))?;
        url.query_pairs_mut().append_pair("type", kind.as_str());
        Ok(url)
    }
}

#[async_trait]
impl UploadRegistry for ApiClient {
    async fn initiate_upload(&self, project: &str, parts: Option<u32>) -> Result<UploadSlot> {
        let url = self.uploads_url(project, parts)?;
        info!("POST {}", url.path());

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Upload initiation failed: {}", e)))?;

        let response = check_status("POST", &url, response).await?;
        let slot: UploadSlot = read_json(response, "upload").await?;
        debug!(
            "Upload slot {} ({} part URLs)",
            slot.id,
            slot.upload_urls.len()
        );
        Ok(slot)
    }

    async fn complete_multipart(
        &self,
        project: &str,
        request: &CompleteMultipartRequest,
    ) -> Result<()> {
        let url = self.complete_url(project, &request.id)?;
        info!("POST {} ({} parts)", url.path(), request.part_e_tags.len());

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(self.token.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Multipart completion failed: {}", e)))?;

        check_status("POST", &url, response).await?;
        Ok(())
    }
}

#[async_trait]
impl JobService for ApiClient {
    async fn submit_job(&self, request: &JobRequest) -> Result<JobDetail> {
        let url = self.endpoint("/jobs")?;
        info!("POST {} ({})", url.path(), request.kind);

        let response = self
            .client
            .post(url.clone())
            .bearer_auth(self.token.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Job submission failed: {}", e)))?;

        let response = check_status("POST", &url, response).await?;
        read_json(response, "job submission").await
    }

    async fn job_status(&self, job_id: &str, kind: JobKind) -> Result<JobDetail> {
        let url = self.job_url(job_id, kind)?;
        debug!("GET {}", url.path());

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Job status check failed: {}", e)))?;

        let response = check_status("GET", &url, response).await?;
        read_json(response, "job status").await
    }
}

/// Presigned uploads and authenticated downloads
#[derive(Clone)]
pub struct HttpTransfer {
    client: Arc<Client>,
    token: Option<SecretString>,
}

#[async_trait]
impl FileTransfer for HttpTransfer {
    async fn put_file(&self, url: &str, path: &Path, content_type: &str) -> Result<PutReceipt> {
        let target = parse_url(url)?;
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();

        info!("PUT {} ({} bytes)", redact(&target), size);

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .client
            .put(target.clone())
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .map_err(|e| LoadError::network(format!("File upload failed: {}", e)))?;

        let response = check_status("PUT", &target, response).await?;
        Ok(receipt(&response))
    }

    async fn put_bytes(&self, url: &str, body: Bytes, content_type: &str) -> Result<PutReceipt> {
        let target = parse_url(url)?;
        debug!("PUT {} ({} bytes)", redact(&target), body.len());

        let response = self
            .client
            .put(target.clone())
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Part upload failed: {}", e)))?;

        let response = check_status("PUT", &target, response).await?;
        Ok(receipt(&response))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let source = parse_url(url)?;
        info!("GET {} (downloading)", redact(&source));

        let mut request = self.client.get(source.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        let response = request
            .send()
            .await
            .map_err(|e| LoadError::network(format!("Download failed: {}", e)))?;

        let response = check_status("GET", &source, response).await?;
        let total_bytes = stream_to_file(response.bytes_stream(), dest).await?;

        info!("Downloaded {} bytes to {}", total_bytes, dest.display());
        Ok(total_bytes)
    }
}

/// Write `chunks` to a temporary file beside `dest` and move it into place
///
/// `dest` is untouched unless the whole body arrived.
async fn stream_to_file<S, E>(chunks: S, dest: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let (file, temp_path) = tempfile::Builder::new()
        .prefix(".dataload_")
        .tempfile_in(dir)?
        .into_parts();

    let mut file = File::from_std(file);
    let mut chunks = std::pin::pin!(chunks);
    let mut total_bytes = 0u64;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk
            .map_err(|e| LoadError::network(format!("Error reading response stream: {}", e)))?;
        file.write_all(&chunk).await?;
        total_bytes += chunk.len() as u64;
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    temp_path.persist(dest).map_err(|e| e.error)?;
    Ok(total_bytes)
}

async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response
        .bytes()
        .await
        .map_err(|e| LoadError::network(format!("Failed to read {} response: {}", what, e)))?;
    parse_json(&body, what)
}

/// A 2xx body that does not decode breaks the API contract; retrying will not help
fn parse_json<T: DeserializeOwned>(body: &[u8], what: &str) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        LoadError::ContractViolation(format!("Malformed {} response: {}", what, e))
    })
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| LoadError::Validation(format!("Invalid URL: {}", e)))
}

/// Scheme, host and path only; query strings on presigned URLs are credentials
fn redact(url: &Url) -> String {
    format!(
        "{}://{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.path()
    )
}

fn receipt(response: &Response) -> PutReceipt {
    PutReceipt {
        status: response.status().as_u16(),
        etag: response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    }
}

/// Log the status and turn anything but 2xx into a transport error carrying the body
async fn check_status(method: &str, url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    info!("{} {} -> {}", method, redact(url), status.as_u16());

    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("Unable to read error body"));
    let reason = status.canonical_reason().unwrap_or("Unknown status");
    let message = if body.trim().is_empty() {
        format!("{} {}: {}", method, url.path(), reason)
    } else {
        format!("{} {}: {}: {}", method, url.path(), reason, body.trim())
    };
    Err(LoadError::http_status(status.as_u16(), message))
}
