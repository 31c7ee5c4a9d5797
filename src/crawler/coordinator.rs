//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one search from request to ordered records:
//! - Fetching the configured number of search result pages
//! - Parsing and de-duplicating candidate URLs
//! - Enriching repository candidates concurrently
//! - Reassembling records in discovery order

use crate::config::Config;
use crate::crawler::fetcher::{FetchStatus, Fetcher, PageFetcher, RetryPolicy};
use crate::crawler::parser::{parse_repository_page, parse_search_page, ParseError};
use crate::model::{CrawlResult, RepositoryExtra, SearchRecord, SearchRequest};
use crate::output::CrawlSummary;
use crate::proxy::{ProxyMode, ProxyPool};
use crate::url::{build_search_url, dedup_key, owner_from_repository_url};
use crate::CrawlerError;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Crawl parameters taken from the configuration
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Site root search URLs are built on
    pub base_url: Url,

    /// Number of search result pages to read
    pub search_pages: u32,

    pub retry: RetryPolicy,

    /// Rescale language percentages to sum to 100
    pub normalize_language_stats: bool,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Result<Self, CrawlerError> {
        Ok(Self {
            base_url: Url::parse(&config.crawler.base_url)?,
            search_pages: config.crawler.search_pages.max(1),
            retry: RetryPolicy::from_config(&config.crawler),
            normalize_language_stats: config.crawler.normalize_language_stats,
        })
    }
}

/// How enrichment of one candidate ended
enum Enrichment {
    Enriched(RepositoryExtra),
    Degraded(String),
}

/// Main crawler coordinator structure
///
/// A coordinator can run any number of crawls. Nothing is carried from one
/// crawl to the next except the proxy health kept by the fetcher.
pub struct Coordinator {
    fetcher: Arc<dyn PageFetcher>,
    settings: CrawlSettings,
}

impl Coordinator {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: CrawlSettings) -> Self {
        Self { fetcher, settings }
    }

    /// Creates a coordinator backed by the HTTP fetcher
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Fetcher and settings were built
    /// * `Err(CrawlerError)` - Invalid settings, or proxy use is required
    ///   but the pool has no endpoints
    pub fn from_config(config: &Config, pool: Arc<ProxyPool>) -> Result<Self, CrawlerError> {
        let settings = CrawlSettings::from_config(config)?;

        if config.proxy.mode == ProxyMode::Required && pool.is_empty() {
            return Err(CrawlerError::ProxyRequired {
                url: settings.base_url.to_string(),
            });
        }

        let fetcher = Fetcher::new(config, pool)?;
        Ok(Self::new(Arc::new(fetcher), settings))
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Runs one crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - Records in discovery order; repository records
    ///   whose enrichment failed are included without `extra`
    /// * `Err(CrawlerError)` - A search page could not be fetched or parsed
    pub async fn crawl(&self, request: &SearchRequest) -> Result<CrawlResult, CrawlerError> {
        let started = Instant::now();
        let mut summary = CrawlSummary::new();

        tracing::info!(
            query = %request.query(),
            search_type = %request.search_type(),
            pages = self.settings.search_pages,
            "Starting crawl"
        );

        let candidates = self.collect_candidates(request, &mut summary).await?;

        let records = if request.search_type().is_enriched() {
            self.enrich_all(&candidates, &mut summary).await
        } else {
            candidates
                .iter()
                .map(|url| SearchRecord::bare(url.as_str()))
                .collect()
        };

        summary.records = records.len();
        summary.duration = started.elapsed();

        tracing::info!(
            records = summary.records,
            enriched = summary.enriched,
            degraded = summary.degraded,
            duplicates = summary.duplicates_suppressed,
            elapsed_ms = summary.duration.as_millis() as u64,
            "Crawl completed"
        );

        Ok(CrawlResult { records, summary })
    }

    /// Fetches and parses search pages, returning unique candidates in order
    async fn collect_candidates(
        &self,
        request: &SearchRequest,
        summary: &mut CrawlSummary,
    ) -> Result<Vec<Url>, CrawlerError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates = Vec::new();

        for page in 1..=self.settings.search_pages {
            let search_url = build_search_url(&self.settings.base_url, request, page)?;

            let fetched = self.fetcher.fetch(search_url.as_str(), &self.settings.retry).await;
            let body = match (fetched.status, fetched.body) {
                (FetchStatus::Ok, Some(body)) => body,
                _ => {
                    return Err(CrawlerError::SearchFetch {
                        url: search_url.to_string(),
                        attempts: fetched.attempts,
                        reason: fetched
                            .reason
                            .unwrap_or_else(|| "no response body".to_string()),
                    })
                }
            };

            let parsed = parse_search_page(&body, request.search_type(), &self.settings.base_url)
                .map_err(|source| CrawlerError::SearchParse {
                    url: search_url.to_string(),
                    source,
                })?;

            summary.pages_fetched += 1;
            summary.candidates_found += parsed.candidates.len();
            summary.candidates_skipped += parsed.skipped;

            tracing::debug!(
                page,
                candidates = parsed.candidates.len(),
                skipped = parsed.skipped,
                "Search page parsed"
            );

            if page > 1 && parsed.candidates.is_empty() {
                tracing::debug!(page, "No further results; stopping pagination");
                break;
            }

            // The first spelling seen is the one emitted
            for candidate in parsed.candidates {
                if seen.insert(dedup_key(&candidate)) {
                    candidates.push(candidate);
                } else {
                    tracing::debug!(url = %candidate, "Duplicate candidate suppressed");
                    summary.duplicates_suppressed += 1;
                }
            }
        }

        Ok(candidates)
    }

    /// Enriches every candidate concurrently and assembles records by index
    async fn enrich_all(&self, candidates: &[Url], summary: &mut CrawlSummary) -> Vec<SearchRecord> {
        let outcomes = join_all(candidates.iter().map(|url| self.enrich(url))).await;

        candidates
            .iter()
            .zip(outcomes)
            .map(|(url, outcome)| match outcome {
                Enrichment::Enriched(extra) => {
                    summary.enriched += 1;
                    SearchRecord::enriched(url.as_str(), extra)
                }
                Enrichment::Degraded(reason) => {
                    tracing::warn!(url = %url, %reason, "Enrichment failed; emitting record without extra");
                    summary.degraded += 1;
                    SearchRecord::bare(url.as_str())
                }
            })
            .collect()
    }

    async fn enrich(&self, url: &Url) -> Enrichment {
        let fetched = self.fetcher.fetch(url.as_str(), &self.settings.retry).await;

        let body = match (fetched.status, fetched.body.as_deref()) {
            (FetchStatus::Ok, Some(body)) => body,
            _ => return Enrichment::Degraded(fetched.describe()),
        };

        let details = match parse_repository_page(body) {
            Ok(details) => details,
            Err(e) => return Enrichment::Degraded(describe_parse_error(&e)),
        };

        let owner = match details.owner.or_else(|| owner_from_repository_url(url.as_str())) {
            Some(owner) => owner,
            None => return Enrichment::Degraded("repository owner could not be determined".to_string()),
        };

        let language_stats = if self.settings.normalize_language_stats {
            details.language_stats.normalized()
        } else {
            details.language_stats
        };

        Enrichment::Enriched(RepositoryExtra {
            owner,
            language_stats,
        })
    }
}

fn describe_parse_error(error: &ParseError) -> String {
    format!("repository page not usable: {}", error)
}
