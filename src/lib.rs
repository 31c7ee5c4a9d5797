//! github-crawler: keyword crawler for GitHub's public search pages
//!
//! This crate searches GitHub for repositories, issues or wiki pages matching
//! a set of keywords, optionally through a pool of rotating proxies, and
//! enriches repository hits with their owner and language breakdown.

pub mod config;
pub mod crawler;
pub mod input;
pub mod model;
pub mod output;
pub mod proxy;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid search request: {0}")]
    InvalidRequest(String),

    #[error("Search page {url} could not be fetched after {attempts} attempt(s): {reason}")]
    SearchFetch {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("Search page {url} could not be parsed: {source}")]
    SearchParse {
        url: String,
        source: crawler::ParseError,
    },

    #[error("No proxy available for {url} and proxy use is required")]
    ProxyRequired { url: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Input error: {0}")]
    Input(#[from] input::InputError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid proxy endpoint: {0}")]
    InvalidProxy(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator, Fetcher, PageFetcher};
pub use model::{CrawlResult, LanguageStats, RepositoryExtra, SearchRecord, SearchRequest, SearchType};
pub use proxy::{ProxyEndpoint, ProxyMode, ProxyPool};
