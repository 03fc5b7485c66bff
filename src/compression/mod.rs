/*!
 * Gzip compression for multipart parts
 */

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{LoadError, Result};

/// Sizes before and after compressing one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionStats {
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

impl CompressionStats {
    /// Compressed size as a percentage of the original
    pub fn ratio(&self) -> f64 {
        if self.original_bytes == 0 {
            return 100.0;
        }
        (self.compressed_bytes as f64 / self.original_bytes as f64) * 100.0
    }
}

/// Gzip a buffer in memory
pub fn gzip(data: &[u8]) -> Result<(Vec<u8>, CompressionStats)> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| LoadError::Compression(e.to_string()))?;
    let compressed = encoder
        .finish()
        .map_err(|e| LoadError::Compression(e.to_string()))?;

    let stats = CompressionStats {
        original_bytes: data.len() as u64,
        compressed_bytes: compressed.len() as u64,
    };
    debug!(
        "Gzip: {} bytes -> {} bytes ({:.1}%)",
        stats.original_bytes,
        stats.compressed_bytes,
        stats.ratio()
    );

    Ok((compressed, stats))
}

/// Decompress a gzip buffer in memory
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| LoadError::Compression(format!("gzip decode failed: {}", e)))?;
    Ok(out)
}
