//! Crawl input files
//!
//! An input file is JSON in one of two shapes:
//!
//! ```json
//! {"keywords": ["openstack", "nova", "css"], "proxies": ["194.126.37.94:8080"], "type": "Repositories"}
//! ```
//!
//! or an array of records produced by an earlier crawl, which is validated
//! and emitted again unchanged.

use crate::model::{SearchRecord, SearchRequest, SearchType};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Errors that can occur while reading an input file
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input is neither a search request nor a list of records: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// A search request as written in an input file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestInput {
    pub keywords: Vec<String>,

    /// Extra proxy endpoints, merged with the configured ones
    #[serde(default)]
    pub proxies: Vec<String>,

    #[serde(rename = "type")]
    pub search_type: SearchType,
}

impl RequestInput {
    pub fn to_request(&self) -> Result<SearchRequest, InputError> {
        SearchRequest::new(&self.keywords, self.search_type)
            .map_err(|e| InputError::Invalid(e.to_string()))
    }
}

/// Parsed contents of an input file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CrawlInput {
    /// Run a crawl
    Request(RequestInput),

    /// Emit these records without crawling
    Records(Vec<SearchRecord>),
}

/// Loads and validates an input file
pub fn load_input(path: &Path) -> Result<CrawlInput, InputError> {
    let content = fs::read_to_string(path)?;
    parse_input(&content)
}

/// Parses and validates input JSON
///
/// # Returns
///
/// * `Ok(CrawlInput)` - A usable request or record list
/// * `Err(InputError)` - Malformed JSON, an empty keyword list, or a record
///   whose URL is not absolute HTTP(S)
pub fn parse_input(content: &str) -> Result<CrawlInput, InputError> {
    let input: CrawlInput = serde_json::from_str(content)?;

    match &input {
        CrawlInput::Request(request) => {
            request.to_request()?;
        }
        CrawlInput::Records(records) => {
            for record in records {
                validate_record(record)?;
            }
        }
    }

    Ok(input)
}

fn validate_record(record: &SearchRecord) -> Result<(), InputError> {
    let url = Url::parse(&record.url)
        .map_err(|e| InputError::Invalid(format!("record url '{}': {}", record.url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(InputError::Invalid(format!(
            "record url '{}' is not HTTP(S)",
            record.url
        )));
    }

    Ok(())
}
