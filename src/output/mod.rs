//! Output module for crawl results and summaries
//!
//! This module handles:
//! - Rendering records as the JSON array consumers read
//! - Writing results to a timestamped file or to stdout
//! - Recording and printing crawl statistics

mod json;
pub mod stats;
mod traits;

pub use json::{records_to_json, result_file_name, write_results};
pub use stats::{format_summary, print_summary, CrawlSummary};
pub use traits::{JsonFileSink, OutputError, OutputResult, ResultSink, StdoutSink};
