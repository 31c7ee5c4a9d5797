//! JSON rendering of crawl records
//!
//! Records are written as a pretty-printed JSON array with four-space
//! indentation, one file per crawl, named after the time the crawl finished.

use crate::model::SearchRecord;
use crate::output::OutputResult;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Serializes records as a four-space indented JSON array
pub fn records_to_json(records: &[SearchRecord]) -> OutputResult<String> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    records.serialize(&mut serializer)?;

    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// File name for results produced at `timestamp`
///
/// # Example
///
/// ```
/// use chrono::{Local, TimeZone};
/// use github_crawler::output::result_file_name;
///
/// let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
/// assert_eq!(result_file_name(&at), "2024_03_09_14_05_07_items.json");
/// ```
pub fn result_file_name(timestamp: &DateTime<Local>) -> String {
    format!("{}_items.json", timestamp.format("%Y_%m_%d_%H_%M_%S"))
}

/// Writes records to a timestamped file inside `directory`
///
/// The directory is created when missing.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the written file
/// * `Err(OutputError)` - The directory or file could not be written
pub fn write_results(
    directory: &Path,
    records: &[SearchRecord],
    timestamp: &DateTime<Local>,
) -> OutputResult<PathBuf> {
    fs::create_dir_all(directory)?;

    let path = directory.join(result_file_name(timestamp));
    let json = records_to_json(records)?;

    let mut file = fs::File::create(&path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;

    tracing::info!(path = %path.display(), records = records.len(), "Results written");

    Ok(path)
}
