//! Dataset export to a local CSV file

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use super::poller::{JobPoller, PollSettings};
use crate::config::LoaderConfig;
use crate::error::{LoadError, Result};
use crate::protocol::types::{JobDetail, JobKind, JobRequest};
use crate::protocol::{FileTransfer, JobService};

/// Runs `dataDump` jobs and downloads their result
pub struct DataDumper {
    jobs: Arc<dyn JobService>,
    transfer: Arc<dyn FileTransfer>,
    settings: PollSettings,
    base_url: String,
    result_link_prefix: String,
}

impl DataDumper {
    /// `base_url` is the API address result links are resolved against
    pub fn new(
        jobs: Arc<dyn JobService>,
        transfer: Arc<dyn FileTransfer>,
        base_url: &str,
        config: &LoaderConfig,
    ) -> Self {
        Self {
            jobs,
            transfer,
            settings: config.poll_settings(),
            base_url: base_url.trim_end_matches('/').to_string(),
            result_link_prefix: config.result_link_prefix.clone(),
        }
    }

    /// Dump `dataset` into `output_dir/<dataset>.csv`, polling at the configured interval
    pub async fn dump(&self, project: &str, dataset: &str, output_dir: &Path) -> Result<PathBuf> {
        self.dump_with_interval(project, dataset, output_dir, self.settings.interval)
            .await
    }

    /// Same as [`dump`](Self::dump) with an explicit poll interval
    pub async fn dump_with_interval(
        &self,
        project: &str,
        dataset: &str,
        output_dir: &Path,
        poll_interval: Duration,
    ) -> Result<PathBuf> {
        debug!(
            "Starting data dump for project {}, dataset {}",
            project, dataset
        );
        tokio::fs::create_dir_all(output_dir).await?;

        let job = self
            .jobs
            .submit_job(&JobRequest::data_dump(project, dataset))
            .await?;
        info!("Dump job submitted with ID: {}", job.id);

        let poller = JobPoller::new(
            Arc::clone(&self.jobs),
            PollSettings {
                interval: poll_interval,
                ..self.settings
            },
        );
        poller.poll(&job.id, JobKind::DataDump).await?;

        let detail = self.jobs.job_status(&job.id, JobKind::DataDump).await?;
        let link = detail.result_link().ok_or_else(|| {
            LoadError::ContractViolation(format!(
                "No result file URL found in response for job {}",
                job.id
            ))
        })?;

        let url = self.resolve_link(link);
        debug!("Got result file URL: {}", link);

        let destination = output_dir.join(format!("{}.csv", dataset));
        let bytes = self.transfer.download(&url, &destination).await?;
        info!(
            "Dataset '{}' written to {} ({} bytes)",
            dataset,
            destination.display(),
            bytes
        );

        Ok(destination)
    }

    /// Current status of a dump job
    pub async fn job_status(&self, job_id: &str) -> Result<JobDetail> {
        self.jobs.job_status(job_id, JobKind::DataDump).await
    }

    /// Absolute download address for a result link
    ///
    /// Absolute links are used as-is. Relative links are appended to the base
    /// address after dropping the configured prefix, since the base address
    /// already ends with it.
    pub fn resolve_link(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            return link.to_string();
        }

        let prefix = self.result_link_prefix.as_str();
        let rest = match link.strip_prefix(prefix) {
            Some(rest) if !prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
            _ => link,
        };

        if rest.starts_with('/') || rest.is_empty() {
            format!("{}{}", self.base_url, rest)
        } else {
            format!("{}/{}", self.base_url, rest)
        }
    }
}
