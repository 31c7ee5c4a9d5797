//! Crawler module for GitHub search crawling
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with admission control, retry and proxy rotation
//! - Parsing of search result and repository pages
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{CrawlSettings, Coordinator};
pub use fetcher::{
    build_http_client, FetchResult, FetchStatus, Fetcher, PageFetcher, RetryPolicy,
};
pub use parser::{
    parse_repository_page, parse_search_page, Extracted, ParseError, RepositoryDetails, SearchPage,
};

use crate::config::Config;
use crate::model::{CrawlResult, SearchRequest};
use crate::proxy::ProxyPool;
use crate::CrawlerError;
use std::sync::Arc;

/// Runs a complete crawl operation
///
/// This is the main entry point for a one-off crawl. It will:
/// 1. Build the proxy pool from the configured endpoints
/// 2. Build the rate-limited fetcher
/// 3. Fetch and parse the search result pages
/// 4. Enrich repository hits
///
/// Callers running several crawls should keep a [`Coordinator`] instead, so
/// proxy health carries over between crawls.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - Keywords and search type
///
/// # Returns
///
/// * `Ok(CrawlResult)` - Records in discovery order
/// * `Err(CrawlerError)` - The crawl failed
pub async fn crawl(config: &Config, request: &SearchRequest) -> Result<CrawlResult, CrawlerError> {
    let pool = Arc::new(ProxyPool::new(&config.proxy.endpoints)?);
    let coordinator = Coordinator::from_config(config, pool)?;
    coordinator.crawl(request).await
}
