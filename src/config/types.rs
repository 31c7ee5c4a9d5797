use crate::proxy::ProxyMode;
use serde::Deserialize;

/// Main configuration structure for the crawler
///
/// Every section is optional in the TOML file and falls back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Site root that search and repository URLs are built on
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum number of in-flight requests (search and enrichment combined)
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Retries after the first attempt for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Backoff before the first retry (milliseconds), doubled per retry
    #[serde(rename = "base-backoff-ms")]
    pub base_backoff_ms: u64,

    /// Upper bound for a single backoff sleep (milliseconds)
    #[serde(rename = "max-backoff-ms")]
    pub max_backoff_ms: u64,

    /// Per-attempt request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Pause after each request before its slot is released (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Number of search result pages fetched per crawl
    #[serde(rename = "search-pages")]
    pub search_pages: u32,

    /// Rescale language percentages to sum to 100
    #[serde(rename = "normalize-language-stats")]
    pub normalize_language_stats: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://github.com".to_string(),
            max_concurrent_requests: 5,
            max_retries: 3,
            base_backoff_ms: 500,
            max_backoff_ms: 30_000,
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            request_delay_ms: 500,
            search_pages: 1,
            normalize_language_stats: false,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "github-crawler".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com".to_string(),
            contact_email: "crawler@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub mode: ProxyMode,

    /// Proxy addresses, `host:port` or full proxy URLs
    pub endpoints: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory timestamped result files are written to
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "output_results".to_string(),
        }
    }
}
