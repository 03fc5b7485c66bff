//! Uploads of whole files and single parts to presigned URLs

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, error};

use super::splitter::Part;
use crate::compression;
use crate::error::{LoadError, Result};
use crate::protocol::{FileTransfer, PutReceipt};

/// Opaque integrity tag (ETag) returned by the object store for one part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityTag(String);

impl IntegrityTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for IntegrityTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Puts files and parts on presigned URLs. Nothing here retries.
#[derive(Clone)]
pub struct PartUploader {
    transfer: Arc<dyn FileTransfer>,
    content_type: String,
    compress: bool,
}

impl PartUploader {
    pub fn new(transfer: Arc<dyn FileTransfer>, content_type: impl Into<String>, compress: bool) -> Self {
        Self {
            transfer,
            content_type: content_type.into(),
            compress,
        }
    }

    /// Stream a whole file uncompressed
    pub async fn upload_whole(&self, url: &str, path: &Path) -> Result<()> {
        let receipt = self
            .transfer
            .put_file(url, path, &self.content_type)
            .await
            .inspect_err(|e| error!("Error during file upload: {}", e))?;
        debug!("Whole-file upload finished with HTTP {}", receipt.status);
        Ok(())
    }

    /// Read a part into memory, compress it if enabled, and upload it
    pub async fn upload_part(&self, url: &str, part: &Part) -> Result<IntegrityTag> {
        let data = tokio::fs::read(&part.path).await?;
        debug!("Uploading part {} ({} rows)", part.number, part.rows);
        self.upload_part_bytes(url, data)
            .await
            .inspect_err(|e| error!("Failed to upload part {}: {}", part.number, e))
    }

    /// Upload an in-memory part body and return its integrity tag
    pub async fn upload_part_bytes(&self, url: &str, data: Vec<u8>) -> Result<IntegrityTag> {
        let body = if self.compress {
            let (compressed, stats) = compression::gzip(&data)?;
            debug!(
                "Original size: {} bytes, compressed size: {} bytes",
                stats.original_bytes, stats.compressed_bytes
            );
            compressed
        } else {
            data
        };

        let receipt = self
            .transfer
            .put_bytes(url, Bytes::from(body), &self.content_type)
            .await?;
        integrity_tag(receipt)
    }
}

fn integrity_tag(receipt: PutReceipt) -> Result<IntegrityTag> {
    match receipt.etag {
        Some(tag) if !tag.is_empty() => Ok(IntegrityTag(tag)),
        _ => Err(LoadError::ContractViolation(format!(
            "No ETag returned for uploaded part (HTTP {})",
            receipt.status
        ))),
    }
}
