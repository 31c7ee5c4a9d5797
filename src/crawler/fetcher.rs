//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients (one per proxy endpoint, one direct)
//! - Admission control through a shared semaphore
//! - Retry with exponential jittered backoff for transient failures
//! - Proxy rotation and health reporting
//! - Error classification

use crate::config::{Config, CrawlerConfig, UserAgentConfig};
use crate::proxy::{ProxyEndpoint, ProxyMode, ProxyPool};
use crate::CrawlerError;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{redirect::Policy, Client, Proxy, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Final classification of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The page was fetched and has a body
    Ok,

    /// A retryable failure (rate limit, 5xx, timeout, connection error)
    TransientError,

    /// Retrying will not help (client error, exhausted retries, bad URL)
    TerminalError,
}

/// Result of a fetch operation
///
/// `body` is only present when `status` is `Ok`.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The requested URL
    pub url: String,

    pub status: FetchStatus,

    pub body: Option<String>,

    /// Number of attempts made (0 when the URL was rejected up front)
    pub attempts: u32,

    /// HTTP status code of the last response, if any
    pub status_code: Option<u16>,

    /// Why the fetch did not succeed
    pub reason: Option<String>,
}

impl FetchResult {
    fn ok(url: &str, attempts: u32, status_code: u16, body: String) -> Self {
        Self {
            url: url.to_string(),
            status: FetchStatus::Ok,
            body: Some(body),
            attempts,
            status_code: Some(status_code),
            reason: None,
        }
    }

    fn terminal(url: &str, attempts: u32, status_code: Option<u16>, reason: String) -> Self {
        Self {
            url: url.to_string(),
            status: FetchStatus::TerminalError,
            body: None,
            attempts,
            status_code,
            reason: Some(reason),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    /// Failure description for logs and errors
    pub fn describe(&self) -> String {
        match (&self.reason, self.status_code) {
            (Some(reason), _) => reason.clone(),
            (None, Some(code)) => format!("HTTP {}", code),
            (None, None) => format!("{:?}", self.status),
        }
    }
}

/// Retry budget and backoff schedule for one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each further retry
    pub base_backoff: Duration,

    /// Upper bound for one delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
            max_backoff: Duration::from_secs(30).max(base_backoff),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.base_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Total attempts allowed (initial attempt plus retries)
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (0-based)
    ///
    /// `base_backoff * 2^retry * jitter`, raised to `retry_after` when the
    /// server asked for a longer pause, and capped at `max_backoff`.
    pub fn delay(&self, retry: u32, jitter: f64, retry_after: Option<Duration>) -> Duration {
        let factor = 2u32.saturating_pow(retry.min(20));
        let exponential = self.base_backoff.saturating_mul(factor).mul_f64(jitter.max(0.0));
        let delay = match retry_after {
            Some(requested) => exponential.max(requested),
            None => exponential,
        };
        delay.min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

/// Source of pages for the crawl coordinator
///
/// Implemented by [`Fetcher`] for real HTTP traffic; tests substitute
/// in-memory fetchers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url`, retrying transient failures according to `policy`
    async fn fetch(&self, url: &str, policy: &RetryPolicy) -> FetchResult;
}

/// Outcome of a single HTTP attempt
#[derive(Debug)]
enum Attempt {
    Success {
        status_code: u16,
        body: String,
    },
    Transient {
        status_code: Option<u16>,
        reason: String,
        retry_after: Option<Duration>,
    },
    Terminal {
        status_code: Option<u16>,
        reason: String,
    },
}

/// How a response status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusClass {
    Success,
    Transient,
    Terminal,
}

/// Classifies an HTTP status code
///
/// | Condition | Class |
/// |-----------|-------|
/// | 2xx | Success |
/// | 429 | Transient |
/// | 403 with exhausted rate limit | Transient |
/// | 5xx | Transient |
/// | other 4xx, leftover 3xx | Terminal |
pub(crate) fn classify_status(status: StatusCode, rate_limit_exhausted: bool) -> StatusClass {
    if status.is_success() {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && rate_limit_exhausted)
        || status.is_server_error()
    {
        StatusClass::Transient
    } else {
        StatusClass::Terminal
    }
}

fn rate_limit_exhausted(headers: &HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false)
}

/// Seconds-valued `Retry-After` header
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn jitter_factor() -> f64 {
    rand::thread_rng().gen_range(0.5..1.5)
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Timeouts come from here
/// * `proxy` - Proxy URL to route every request through, if any
///
/// # Example
///
/// ```no_run
/// use github_crawler::config::{CrawlerConfig, UserAgentConfig};
/// use github_crawler::crawler::build_http_client;
///
/// let client = build_http_client(
///     &UserAgentConfig::default(),
///     &CrawlerConfig::default(),
///     Some("http://194.126.37.94:8080"),
/// )
/// .unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent.user_agent_string())
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(crawler.connect_timeout_secs))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true);

    builder = match proxy {
        Some(address) => builder.proxy(Proxy::all(address)?),
        None => builder.no_proxy(),
    };

    builder.build()
}

/// Rate-limited HTTP fetcher
///
/// Every attempt holds one permit of the shared admission semaphore, so the
/// number of in-flight requests never exceeds the configured budget no
/// matter how many fetches are running. Permits are released while a fetch
/// sleeps between retries.
pub struct Fetcher {
    pool: Arc<ProxyPool>,

    /// Clients indexed like the pool's endpoints
    proxied: Vec<Client>,

    direct: Client,

    mode: ProxyMode,

    admission: Arc<Semaphore>,

    /// Pause after each attempt before its permit is released
    request_delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher for the given configuration and proxy pool
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Clients for every proxy endpoint were built
    /// * `Err(CrawlerError)` - A client could not be built
    pub fn new(config: &Config, pool: Arc<ProxyPool>) -> Result<Self, CrawlerError> {
        let direct = build_http_client(&config.user_agent, &config.crawler, None)?;

        let proxied = pool
            .addresses()
            .iter()
            .map(|address| build_http_client(&config.user_agent, &config.crawler, Some(address)))
            .collect::<Result<Vec<_>, _>>()?;

        let permits = config.crawler.max_concurrent_requests.max(1) as usize;

        Ok(Self {
            pool,
            proxied,
            direct,
            mode: config.proxy.mode,
            admission: Arc::new(Semaphore::new(permits)),
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
        })
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }

    /// Permits currently free in the admission semaphore
    pub fn available_permits(&self) -> usize {
        self.admission.available_permits()
    }

    fn client_for(&self, proxy: Option<&ProxyEndpoint>) -> &Client {
        proxy
            .and_then(|endpoint| self.proxied.get(endpoint.index))
            .unwrap_or(&self.direct)
    }

    /// Performs one request under an admission permit
    ///
    /// The proxy is picked only once the permit is held, and its health is
    /// reported before the permit is released, so a request that waited for
    /// a slot never goes out through a proxy that failed in the meantime.
    ///
    /// Returns the proxy used (if any) with the outcome, or `None` when proxy
    /// use is required and the pool has no endpoint.
    async fn attempt(&self, url: &Url) -> Option<(Option<ProxyEndpoint>, Attempt)> {
        let _permit = match self.admission.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                return Some((
                    None,
                    Attempt::Terminal {
                        status_code: None,
                        reason: "admission semaphore closed".to_string(),
                    },
                ))
            }
        };

        let proxy = self.pool.acquire();
        if proxy.is_none() && self.mode == ProxyMode::Required {
            return None;
        }

        let via = proxy
            .as_ref()
            .map(|p| p.address.as_str())
            .unwrap_or("direct");
        tracing::debug!(url = %url, via, "Sending request");

        let outcome = self.send(url, proxy.as_ref()).await;

        if let Some(endpoint) = &proxy {
            match &outcome {
                Attempt::Transient { .. } => self.pool.report_failure(endpoint),
                Attempt::Success { .. } => self.pool.report_success(endpoint),
                // The proxy delivered a response, so it is working
                Attempt::Terminal {
                    status_code: Some(_),
                    ..
                } => self.pool.report_success(endpoint),
                Attempt::Terminal { .. } => {}
            }
        }

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        Some((proxy, outcome))
    }

    async fn send(&self, url: &Url, proxy: Option<&ProxyEndpoint>) -> Attempt {
        let response = match self.client_for(proxy).get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => return classify_transport_error(&e),
        };

        let status = response.status();
        let headers = response.headers().clone();

        match classify_status(status, rate_limit_exhausted(&headers)) {
            StatusClass::Success => match response.text().await {
                Ok(body) if body.trim().is_empty() => Attempt::Transient {
                    status_code: Some(status.as_u16()),
                    reason: "empty response body".to_string(),
                    retry_after: None,
                },
                Ok(body) => Attempt::Success {
                    status_code: status.as_u16(),
                    body,
                },
                Err(e) => Attempt::Transient {
                    status_code: Some(status.as_u16()),
                    reason: format!("failed to read body: {}", e),
                    retry_after: None,
                },
            },
            StatusClass::Transient => Attempt::Transient {
                status_code: Some(status.as_u16()),
                reason: format!("HTTP {}", status.as_u16()),
                retry_after: retry_after(&headers),
            },
            StatusClass::Terminal => Attempt::Terminal {
                status_code: Some(status.as_u16()),
                reason: format!("HTTP {}", status.as_u16()),
            },
        }
    }
}

fn classify_transport_error(e: &reqwest::Error) -> Attempt {
    if e.is_builder() || e.is_redirect() {
        Attempt::Terminal {
            status_code: None,
            reason: e.to_string(),
        }
    } else if e.is_timeout() {
        Attempt::Transient {
            status_code: None,
            reason: "request timeout".to_string(),
            retry_after: None,
        }
    } else if e.is_connect() {
        Attempt::Transient {
            status_code: None,
            reason: "connection failed".to_string(),
            retry_after: None,
        }
    } else {
        Attempt::Transient {
            status_code: None,
            reason: e.to_string(),
            retry_after: None,
        }
    }
}

#[async_trait]
impl PageFetcher for Fetcher {
    /// Fetches a URL with retry, backoff and proxy rotation
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx with body | Ok |
    /// | 429 / rate-limited 403 / 5xx | Retry with fresh proxy |
    /// | Timeout / connection error | Retry with fresh proxy |
    /// | Other 4xx | TerminalError, no retry |
    /// | Retries exhausted | TerminalError |
    async fn fetch(&self, url: &str, policy: &RetryPolicy) -> FetchResult {
        let parsed = match Url::parse(url) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => parsed,
            Ok(parsed) => {
                tracing::warn!(url, scheme = parsed.scheme(), "Refusing to fetch non-HTTP URL");
                return FetchResult::terminal(url, 0, None, "unsupported URL scheme".to_string());
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Refusing to fetch malformed URL");
                return FetchResult::terminal(url, 0, None, format!("malformed URL: {}", e));
            }
        };

        let max_attempts = policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            tracing::debug!(url, attempt, max_attempts, "Fetch attempt");

            let Some((proxy, outcome)) = self.attempt(&parsed).await else {
                tracing::error!(url, "No proxy available and proxy use is required");
                return FetchResult::terminal(
                    url,
                    attempt - 1,
                    None,
                    "no proxy available".to_string(),
                );
            };
            let via = proxy
                .as_ref()
                .map(|p| p.address.as_str())
                .unwrap_or("direct");

            match outcome {
                Attempt::Success { status_code, body } => {
                    tracing::info!(url, attempt, via, status = status_code, "Fetched");
                    return FetchResult::ok(url, attempt, status_code, body);
                }

                Attempt::Terminal {
                    status_code,
                    reason,
                } => {
                    tracing::warn!(url, attempt, via, status = ?status_code, %reason, "Terminal fetch failure");
                    return FetchResult::terminal(url, attempt, status_code, reason);
                }

                Attempt::Transient {
                    status_code,
                    reason,
                    retry_after,
                } => {
                    if attempt >= max_attempts {
                        tracing::warn!(
                            url,
                            attempt,
                            status = ?status_code,
                            %reason,
                            "Retries exhausted"
                        );
                        return FetchResult::terminal(
                            url,
                            attempt,
                            status_code,
                            format!("retries exhausted after {} attempt(s): {}", attempt, reason),
                        );
                    }

                    let delay = policy.delay(attempt - 1, jitter_factor(), retry_after);
                    tracing::warn!(
                        url,
                        attempt,
                        via,
                        status = ?status_code,
                        %reason,
                        delay_ms = delay.as_millis() as u64,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
