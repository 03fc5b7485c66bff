//! CSV upload orchestration
//!
//! [`DataLoader::upload`] validates its input, picks a single-part or
//! multipart upload from the file size, moves the bytes, and submits the
//! `dataPull` job that loads the uploaded file into a dataset.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::poller::JobPoller;
use super::splitter::CsvSplitter;
use super::uploader::PartUploader;
use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};
use crate::protocol::types::{
    CompleteMultipartRequest, CsvOptions, JobDetail, JobKind, JobRequest, LoadMode, PartTag,
    UploadSlot,
};
use crate::protocol::{FileTransfer, JobService, UploadRegistry};

/// What to upload and where to load it
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub project: String,
    pub file: PathBuf,
    pub dataset: String,
    /// `full` or `incremental`
    pub mode: String,
    /// Wait for the load job to finish
    pub wait: bool,
    pub csv_options: CsvOptions,
}

impl LoadRequest {
    pub fn new(project: &str, file: impl Into<PathBuf>, dataset: &str) -> Self {
        Self {
            project: project.to_string(),
            file: file.into(),
            dataset: dataset.to_string(),
            mode: LoadMode::Full.to_string(),
            wait: true,
            csv_options: CsvOptions::default(),
        }
    }
}

/// Upload path chosen for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    SinglePart,
    Multipart { parts: u32 },
}

/// Uploads CSV files and submits load jobs
pub struct DataLoader {
    registry: Arc<dyn UploadRegistry>,
    jobs: Arc<dyn JobService>,
    uploader: PartUploader,
    poller: JobPoller,
    single_part_threshold: u64,
    target_part_size: u64,
}

impl DataLoader {
    pub fn new(
        registry: Arc<dyn UploadRegistry>,
        jobs: Arc<dyn JobService>,
        transfer: Arc<dyn FileTransfer>,
        config: &LoaderConfig,
    ) -> Self {
        Self {
            registry,
            poller: JobPoller::new(Arc::clone(&jobs), config.poll_settings()),
            jobs,
            uploader: PartUploader::new(
                transfer,
                config.content_type.clone(),
                config.compress_parts,
            ),
            single_part_threshold: config.single_part_threshold,
            target_part_size: config.target_part_size,
        }
    }

    /// Choose the upload path for a file of `size` bytes
    pub fn strategy(&self, size: u64) -> Result<UploadStrategy> {
        if size <= self.single_part_threshold {
            return Ok(UploadStrategy::SinglePart);
        }

        if self.target_part_size == 0 {
            return Err(LoadError::Validation(
                "target part size must be greater than zero".to_string(),
            ));
        }

        let parts = size.div_ceil(self.target_part_size);
        let parts = u32::try_from(parts).map_err(|_| {
            LoadError::Validation(format!(
                "file of {} bytes needs {} parts, more than supported",
                size, parts
            ))
        })?;
        Ok(UploadStrategy::Multipart { parts })
    }

    /// Upload a CSV file and submit the job that loads it
    ///
    /// Returns the submitted job. With `wait` set, returns only after the job
    /// succeeded.
    pub async fn upload(&self, request: &LoadRequest) -> Result<JobDetail> {
        let mode: LoadMode = request.mode.parse()?;
        let size = source_size(&request.file).await?;

        info!(
            "Uploading CSV file to project {} as dataset '{}' in {} mode",
            request.project, request.dataset, mode
        );
        debug!("File size: {} bytes", size);

        let file_ref = match self.strategy(size)? {
            UploadStrategy::SinglePart => {
                debug!("Using single-part upload");
                self.single_part_upload(&request.project, &request.file)
                    .await?
            }
            UploadStrategy::Multipart { parts } => {
                debug!("Using multipart upload with {} parts", parts);
                self.multipart_upload(&request.project, &request.file, parts)
                    .await?
            }
        };

        let job_request = JobRequest::data_pull(
            &request.project,
            &request.dataset,
            mode,
            &file_ref,
            request.csv_options.clone(),
        );
        let job = self.jobs.submit_job(&job_request).await?;
        info!("Job submitted with ID: {}", job.id);

        if request.wait {
            self.poller.poll(&job.id, JobKind::DataPull).await?;
        }

        Ok(job)
    }

    /// Current status of a load job
    pub async fn job_status(&self, job_id: &str) -> Result<JobDetail> {
        self.jobs.job_status(job_id, JobKind::DataPull).await
    }

    async fn single_part_upload(&self, project: &str, file: &Path) -> Result<String> {
        let slot = self.registry.initiate_upload(project, None).await?;
        let url = slot.upload_url.as_deref().ok_or_else(|| {
            LoadError::ContractViolation("No upload URL in upload response".to_string())
        })?;

        self.uploader.upload_whole(url, file).await?;
        file_reference(&slot)
    }

    async fn multipart_upload(&self, project: &str, file: &Path, parts: u32) -> Result<String> {
        let slot = self.registry.initiate_upload(project, Some(parts)).await?;
        let upload_id = slot.upload_id.clone().ok_or_else(|| {
            LoadError::ContractViolation("No multipart upload id in upload response".to_string())
        })?;
        let file_ref = file_reference(&slot)?;

        let mut splitter = CsvSplitter::new(self.target_part_size);
        splitter.acquire()?;
        let uploaded = self.upload_parts(&splitter, &slot, file, parts).await;
        splitter.release();
        let tags = uploaded?;

        if tags.len() != parts as usize {
            return Err(LoadError::Validation(format!(
                "split produced {} parts but {} were reserved; a row may exceed the target part size",
                tags.len(),
                parts
            )));
        }

        let complete = CompleteMultipartRequest {
            id: slot.id.clone(),
            upload_id,
            part_e_tags: tags,
        };
        self.registry.complete_multipart(project, &complete).await?;
        info!("Completed multipart upload {} ({} parts)", slot.id, parts);

        Ok(file_ref)
    }

    /// Split and upload every part in order, collecting tags as parts are produced
    async fn upload_parts(
        &self,
        splitter: &CsvSplitter,
        slot: &UploadSlot,
        file: &Path,
        parts: u32,
    ) -> Result<Vec<PartTag>> {
        let mut tags = Vec::with_capacity(parts as usize);

        for part in splitter.split(file, parts)? {
            let part = part?;
            let url = slot.part_url(part.number).ok_or_else(|| {
                LoadError::ContractViolation(format!("No upload URL for part {}", part.number))
            })?;

            debug!("Uploading part {}/{}", part.number, parts);
            let tag = self.uploader.upload_part(url, &part).await?;
            tags.push(PartTag {
                e_tag: tag.into_inner(),
                part_number: part.number,
            });
        }

        Ok(tags)
    }
}

async fn source_size(path: &Path) -> Result<u64> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::SourceNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_file() {
        return Err(LoadError::Validation(format!(
            "{} is not a regular file",
            path.display()
        )));
    }
    Ok(metadata.len())
}

/// The `self` link naming the uploaded file
fn file_reference(slot: &UploadSlot) -> Result<String> {
    slot.self_link().map(str::to_string).ok_or_else(|| {
        LoadError::ContractViolation("No file URI found in upload response".to_string())
    })
}
