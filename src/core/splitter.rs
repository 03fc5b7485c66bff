//! Row-aligned CSV splitting for multipart uploads
//!
//! The splitter streams a CSV file line by line and writes consecutive rows
//! into part files inside a private temporary directory. Every part starts
//! with the source header, rows are never cut, and no more than the requested
//! number of parts is produced: once the last permitted part is open it takes
//! every remaining row.
//!
//! A row that would push the open part past the budget starts the next part,
//! even when the open part holds only the header.
//!
//! Only row boundaries (`\n`) are detected; quoting is not interpreted.
//!
//! ```no_run
//! use dataload::core::splitter::CsvSplitter;
//! use std::path::Path;
//!
//! # fn main() -> dataload::error::Result<()> {
//! let mut splitter = CsvSplitter::new(20 * 1024 * 1024);
//! splitter.acquire()?;
//! for part in splitter.split(Path::new("big.csv"), 6)? {
//!     let part = part?;
//!     println!("part {} has {} rows", part.number, part.rows);
//! }
//! splitter.release();
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{LoadError, Result};

const WORK_DIR_PREFIX: &str = "csv_split_";

/// One part file produced by the splitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// 1-based sequence number
    pub number: u32,
    pub path: PathBuf,
    /// Size in bytes, header included
    pub size: u64,
    /// Data rows, header excluded
    pub rows: u64,
}

/// Splits CSV files into header-carrying parts within a byte budget
#[derive(Debug)]
pub struct CsvSplitter {
    chunk_size: u64,
    work_dir: Option<TempDir>,
}

impl CsvSplitter {
    /// Create a splitter whose parts aim for `chunk_size` bytes each
    pub fn new(chunk_size: u64) -> Self {
        Self {
            chunk_size,
            work_dir: None,
        }
    }

    /// Create the private working directory; a second call reuses it
    pub fn acquire(&mut self) -> Result<&Path> {
        if self.work_dir.is_none() {
            let dir = tempfile::Builder::new().prefix(WORK_DIR_PREFIX).tempdir()?;
            debug!("Acquired split directory {}", dir.path().display());
            self.work_dir = Some(dir);
        }

        match &self.work_dir {
            Some(dir) => Ok(dir.path()),
            None => Err(LoadError::Usage(
                "split work directory could not be created".to_string(),
            )),
        }
    }

    /// Working directory, if acquired
    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_ref().map(TempDir::path)
    }

    /// Delete every part file and the working directory
    ///
    /// Deletion failures are logged and otherwise ignored. Safe to call more
    /// than once; also runs on drop.
    pub fn release(&mut self) {
        let Some(dir) = self.work_dir.take() else {
            return;
        };

        match fs::read_dir(dir.path()) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if let Err(e) = fs::remove_file(&path) {
                        warn!("Failed to remove temporary file {}: {}", path.display(), e);
                    }
                }
            }
            Err(e) => warn!(
                "Failed to list temporary directory {}: {}",
                dir.path().display(),
                e
            ),
        }

        let path = dir.path().to_path_buf();
        if let Err(e) = dir.close() {
            warn!("Failed to remove temporary directory {}: {}", path.display(), e);
        } else {
            debug!("Released split directory {}", path.display());
        }
    }

    /// Start a fresh pass over `source`, producing at most `parts` parts
    ///
    /// The header is read immediately; rows are read lazily as the iterator
    /// advances. Part files of an earlier pass are overwritten.
    pub fn split(&self, source: &Path, parts: u32) -> Result<PartIter<'_>> {
        let dir = self.split_dir(parts)?;
        let reader = BufReader::new(File::open(source)?);
        Self::start(dir, reader, &source.display().to_string(), self.chunk_size, parts)
    }

    fn split_dir(&self, parts: u32) -> Result<&Path> {
        let dir = self.work_dir().ok_or_else(|| {
            LoadError::Usage("split called before the work directory was acquired".to_string())
        })?;

        if parts == 0 {
            return Err(LoadError::Validation(
                "requested part count must be at least 1".to_string(),
            ));
        }
        Ok(dir)
    }

    fn start<'a, R: BufRead>(
        dir: &'a Path,
        mut reader: R,
        source: &str,
        budget: u64,
        parts: u32,
    ) -> Result<PartIter<'a, R>> {
        let mut header = Vec::new();
        if reader.read_until(b'\n', &mut header)? == 0 {
            return Err(LoadError::Validation(format!(
                "CSV file {} has no header line",
                source
            )));
        }

        debug!(
            source,
            header_bytes = header.len(),
            budget,
            max_parts = parts,
            "Starting CSV split"
        );

        Ok(PartIter {
            dir,
            reader,
            header,
            budget,
            max_parts: parts,
            emitted: 0,
            pending: None,
            done: false,
        })
    }
}

impl Drop for CsvSplitter {
    fn drop(&mut self) {
        self.release();
    }
}

/// Lazy sequence of parts from one split pass
///
/// Each part file is complete and closed before it is yielded, and the next
/// one is only created when iteration resumes. After an error the iterator
/// is exhausted.
pub struct PartIter<'a, R = BufReader<File>> {
    dir: &'a Path,
    reader: R,
    header: Vec<u8>,
    budget: u64,
    max_parts: u32,
    emitted: u32,
    /// Row that closed the previous part; opens the next one
    pending: Option<Vec<u8>>,
    done: bool,
}

impl<R: BufRead> PartIter<'_, R> {
    fn read_row(&mut self) -> Result<Option<Vec<u8>>> {
        let mut row = Vec::new();
        if self.reader.read_until(b'\n', &mut row)? == 0 {
            return Ok(None);
        }
        Ok(Some(row))
    }

    fn next_part(&mut self) -> Result<Option<Part>> {
        // A part only closes early when it leaves a row behind
        if self.emitted > 0 && self.pending.is_none() {
            return Ok(None);
        }

        let number = self.emitted + 1;
        let path = self.dir.join(format!("part_{}.csv", number));

        match self.write_part(&path, number) {
            Ok(part) => {
                self.emitted = number;
                Ok(Some(part))
            }
            Err(e) => {
                if path.is_file() {
                    if let Err(rm) = fs::remove_file(&path) {
                        warn!("Failed to remove partial part {}: {}", path.display(), rm);
                    }
                }
                Err(e)
            }
        }
    }

    fn write_part(&mut self, path: &Path, number: u32) -> Result<Part> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&self.header)?;
        let mut size = self.header.len() as u64;
        let mut rows = 0u64;

        if let Some(row) = self.pending.take() {
            writer.write_all(&row)?;
            size += row.len() as u64;
            rows += 1;
        }

        while let Some(row) = self.read_row()? {
            let row_bytes = row.len() as u64;
            if size + row_bytes > self.budget && number < self.max_parts {
                self.pending = Some(row);
                break;
            }
            writer.write_all(&row)?;
            size += row_bytes;
            rows += 1;
        }

        writer.flush()?;
        drop(writer);

        debug!(part = number, rows, bytes = size, "Wrote CSV part");

        Ok(Part {
            number,
            path: path.to_path_buf(),
            size,
            rows,
        })
    }
}

impl<R: BufRead> Iterator for PartIter<'_, R> {
    type Item = Result<Part>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_part() {
            Ok(Some(part)) => Some(Ok(part)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
