//! Result sinks
//!
//! A sink receives the records of a finished crawl. The binary picks the
//! file sink by default and the stdout sink with `--stdout`.

use crate::model::SearchRecord;
use crate::output::json::{records_to_json, write_results};
use chrono::Local;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for crawl records
pub trait ResultSink {
    /// Emits the records
    ///
    /// # Returns
    ///
    /// The path of the written file, for sinks that write one
    fn write(&self, records: &[SearchRecord]) -> OutputResult<Option<PathBuf>>;
}

/// Writes `<directory>/<timestamp>_items.json`
pub struct JsonFileSink {
    directory: PathBuf,
}

impl JsonFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }
}

impl ResultSink for JsonFileSink {
    fn write(&self, records: &[SearchRecord]) -> OutputResult<Option<PathBuf>> {
        write_results(&self.directory, records, &Local::now()).map(Some)
    }
}

/// Writes the JSON array to standard output
pub struct StdoutSink;

impl ResultSink for StdoutSink {
    fn write(&self, records: &[SearchRecord]) -> OutputResult<Option<PathBuf>> {
        let json = records_to_json(records)?;
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", json)?;
        handle.flush()?;
        Ok(None)
    }
}
