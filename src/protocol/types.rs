//! Request and response types exchanged with the backend

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;

/// Whether a load replaces (full) or appends to (incremental) a dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    #[default]
    Full,
    Incremental,
}

impl FromStr for LoadMode {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(LoadMode::Full),
            "incremental" => Ok(LoadMode::Incremental),
            other => Err(LoadError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadMode::Full => write!(f, "full"),
            LoadMode::Incremental => write!(f, "incremental"),
        }
    }
}

/// Job type, also used to select the status endpoint variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "dataPull")]
    DataPull,
    #[serde(rename = "dataDump")]
    DataDump,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DataPull => "dataPull",
            JobKind::DataDump => "dataDump",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status as reported by the backend
///
/// Only `Succeeded` and `Failed` are terminal. Labels the client does not
/// know are kept verbatim and treated as still running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Other(label) => label,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(label: &str) -> Self {
        match label {
            "PENDING" => JobStatus::Pending,
            "RUNNING" => JobStatus::Running,
            "SUCCEEDED" => JobStatus::Succeeded,
            "FAILED" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(JobStatus::from(label.as_str()))
    }
}

/// Hypermedia link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub rel: Option<String>,
    pub href: String,
}

/// Response to an upload initiation: presigned URL(s) plus bookkeeping ids
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSlot {
    /// Upload resource id (used for multipart completion)
    #[serde(default)]
    pub id: String,

    /// Single-part presigned URL
    #[serde(default, rename = "uploadUrlEncoded")]
    pub upload_url: Option<String>,

    /// Multipart presigned URLs, index `i` belongs to part `i + 1`
    #[serde(default, rename = "uploadUrlsEncoded")]
    pub upload_urls: Vec<String>,

    /// Object-store multipart upload id
    #[serde(default)]
    pub upload_id: Option<String>,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl UploadSlot {
    /// The `self` link, which names the uploaded file for the load job
    pub fn self_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref() == Some("self"))
            .map(|l| l.href.as_str())
    }

    /// Presigned URL for a 1-based part number
    pub fn part_url(&self, part_number: u32) -> Option<&str> {
        let index = (part_number as usize).checked_sub(1)?;
        self.upload_urls.get(index).map(String::as_str)
    }
}

/// One completed part of a multipart upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartTag {
    #[serde(rename = "eTag")]
    pub e_tag: String,
    pub part_number: u32,
}

/// Body of the multipart completion request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteMultipartRequest {
    pub id: String,
    pub upload_id: String,
    #[serde(rename = "partETags")]
    pub part_e_tags: Vec<PartTag>,
}

/// CSV dialect hints forwarded to the load job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escape: Option<String>,
    #[serde(rename = "null", skip_serializing_if = "Option::is_none")]
    pub null_value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub force_null: Vec<String>,
}

impl CsvOptions {
    pub fn is_empty(&self) -> bool {
        *self == CsvOptions::default()
    }
}

/// Content of a `dataPull` job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPullContent {
    pub dataset: String,
    pub mode: LoadMode,
    #[serde(rename = "type")]
    pub source_type: String,
    pub upload: String,
    #[serde(skip_serializing_if = "CsvOptions::is_empty", default)]
    pub csv_options: CsvOptions,
}

/// Content of a `dataDump` job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDumpContent {
    pub dataset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobContent {
    DataPull(DataPullContent),
    DataDump(DataDumpContent),
}

/// Job submission body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub project_id: String,
    pub content: JobContent,
}

impl JobRequest {
    /// Load the uploaded file at `upload` into `dataset`
    pub fn data_pull(
        project_id: &str,
        dataset: &str,
        mode: LoadMode,
        upload: &str,
        csv_options: CsvOptions,
    ) -> Self {
        Self {
            kind: JobKind::DataPull,
            project_id: project_id.to_string(),
            content: JobContent::DataPull(DataPullContent {
                dataset: dataset.to_string(),
                mode,
                source_type: "csv".to_string(),
                upload: upload.to_string(),
                csv_options,
            }),
        }
    }

    /// Export `dataset` to a downloadable CSV
    pub fn data_dump(project_id: &str, dataset: &str) -> Self {
        Self {
            kind: JobKind::DataDump,
            project_id: project_id.to_string(),
            content: JobContent::DataDump(DataDumpContent {
                dataset: dataset.to_string(),
            }),
        }
    }
}

/// Links attached to a finished job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Job as returned by submission and by status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetail {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub result: Option<JobResult>,
}

impl JobDetail {
    /// First result link, if the job produced one
    pub fn result_link(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|r| r.links.first())
            .map(|l| l.href.as_str())
            .filter(|href| !href.is_empty())
    }
}
