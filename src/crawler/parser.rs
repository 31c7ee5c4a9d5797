//! HTML parser for GitHub search and repository pages
//!
//! This module extracts:
//! - Candidate result URLs from a search results page
//! - Owner and language breakdown from a repository page
//!
//! Both entry points are pure functions over one document. Extraction is
//! driven by a fixed set of selectors; each search result is extracted on
//! its own, so one malformed result is skipped without affecting the rest.

use crate::model::{LanguageStats, SearchType};
use crate::url::normalize_candidate_url;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Page-level parse failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("search payload is not usable: {0}")]
    Payload(String),

    #[error("unrecognized page structure: {0}")]
    Unrecognized(String),

    #[error("invalid selector '{0}'")]
    Selector(String),
}

/// Outcome of extracting one item from a page
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted<T> {
    /// The item was extracted
    Found(T),

    /// The item was malformed and is skipped, with the reason
    Skip(String),
}

/// Candidates extracted from one search results page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Normalized candidate URLs in page order (may contain repeats)
    pub candidates: Vec<Url>,

    /// Number of result items that had to be skipped
    pub skipped: usize,
}

/// Data extracted from a repository page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryDetails {
    pub owner: Option<String>,

    /// Percentages exactly as shown on the page
    pub language_stats: LanguageStats,
}

/// Result item container and result link selectors per search type
struct ResultSelectors {
    item: &'static str,
    link: &'static str,
}

fn result_selectors(search_type: SearchType) -> ResultSelectors {
    match search_type {
        SearchType::Repositories => ResultSelectors {
            item: ".repo-list-item",
            link: "a.v-align-middle",
        },
        SearchType::Issues => ResultSelectors {
            item: ".issue-list-item",
            link: "a.Link--primary",
        },
        SearchType::Wikis => ResultSelectors {
            item: ".wiki-list-item",
            link: "a.Link--primary",
        },
    }
}

const EMBEDDED_PAYLOAD: &str = r#"script[data-target="react-app.embeddedData"]"#;

const OWNER_META: &str = r#"meta[name="octolytics-dimension-user_login"]"#;
const OWNER_ELEMENTS: &[&str] = &[r#"[itemprop="author"]"#, r#"a[rel="author"]"#];

const LEGACY_LANGUAGE_GRAPH: &str = ".repository-lang-stats-graph";
const LEGACY_LANGUAGE_ENTRY: &str = ".language-color";
const SIDEBAR_ROW: &str = ".BorderGrid-row";

fn selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|_| ParseError::Selector(css.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a search results page into candidate URLs
///
/// Supports the classic result list markup and, for repository searches,
/// the JSON payload newer search pages embed (or a bare JSON response).
///
/// # Arguments
///
/// * `body` - The fetched page
/// * `search_type` - Which result list to read
/// * `base_url` - Site root that relative result links resolve against
///
/// # Returns
///
/// * `Ok(SearchPage)` - Candidates in page order; a page without results
///   yields an empty list
/// * `Err(ParseError)` - The document is empty or its payload is unusable
///
/// # Example
///
/// ```
/// use github_crawler::crawler::parse_search_page;
/// use github_crawler::SearchType;
/// use url::Url;
///
/// let html = r#"<div class="repo-list-item"><a class="v-align-middle" href="/rust-lang/rust">rust</a></div>"#;
/// let base = Url::parse("https://github.com").unwrap();
/// let page = parse_search_page(html, SearchType::Repositories, &base).unwrap();
/// assert_eq!(page.candidates[0].as_str(), "https://github.com/rust-lang/rust");
/// ```
pub fn parse_search_page(
    body: &str,
    search_type: SearchType,
    base_url: &Url,
) -> Result<SearchPage, ParseError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    let outcomes = if trimmed.starts_with('{') {
        let payload: Value =
            serde_json::from_str(trimmed).map_err(|e| ParseError::Payload(e.to_string()))?;
        payload_candidates(&payload, search_type, base_url)?
    } else {
        let document = Html::parse_document(body);
        let outcomes = html_candidates(&document, search_type, base_url)?;

        match outcomes {
            Some(outcomes) => outcomes,
            None => match embedded_payload(&document)? {
                Some(payload) => payload_candidates(&payload, search_type, base_url)?,
                None => Vec::new(),
            },
        }
    };

    let mut page = SearchPage::default();
    for (position, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Extracted::Found(url) => page.candidates.push(url),
            Extracted::Skip(reason) => {
                tracing::debug!(position, %reason, "Skipping search result");
                page.skipped += 1;
            }
        }
    }

    Ok(page)
}

/// Extracts candidates from the classic result list
///
/// Returns `None` when the page has no result items at all.
fn html_candidates(
    document: &Html,
    search_type: SearchType,
    base_url: &Url,
) -> Result<Option<Vec<Extracted<Url>>>, ParseError> {
    let selectors = result_selectors(search_type);
    let item_selector = selector(selectors.item)?;
    let link_selector = selector(selectors.link)?;

    let outcomes: Vec<Extracted<Url>> = document
        .select(&item_selector)
        .map(|item| extract_candidate(item, &link_selector, base_url))
        .collect();

    if outcomes.is_empty() {
        Ok(None)
    } else {
        Ok(Some(outcomes))
    }
}

fn extract_candidate(item: ElementRef<'_>, link: &Selector, base_url: &Url) -> Extracted<Url> {
    let Some(anchor) = item.select(link).next() else {
        return Extracted::Skip("result item has no result link".to_string());
    };

    let Some(href) = anchor.value().attr("href") else {
        return Extracted::Skip("result link has no href".to_string());
    };

    match normalize_candidate_url(href, base_url) {
        Ok(url) => Extracted::Found(url),
        Err(e) => Extracted::Skip(format!("unusable result link '{}': {}", href, e)),
    }
}

/// Reads the JSON payload embedded in a search page, if there is one
fn embedded_payload(document: &Html) -> Result<Option<Value>, ParseError> {
    let script_selector = selector(EMBEDDED_PAYLOAD)?;

    let Some(script) = document.select(&script_selector).next() else {
        return Ok(None);
    };

    let text: String = script.text().collect();
    serde_json::from_str(text.trim())
        .map(Some)
        .map_err(|e| ParseError::Payload(e.to_string()))
}

/// Extracts candidates from a search payload (`payload.results[]`)
fn payload_candidates(
    payload: &Value,
    search_type: SearchType,
    base_url: &Url,
) -> Result<Vec<Extracted<Url>>, ParseError> {
    let results = payload
        .pointer("/payload/results")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::Payload("missing payload.results".to_string()))?;

    if search_type != SearchType::Repositories {
        tracing::debug!(
            %search_type,
            count = results.len(),
            "Search payload only describes repositories; ignoring it"
        );
        return Ok(Vec::new());
    }

    Ok(results
        .iter()
        .map(|result| {
            let repository = result.pointer("/repo/repository");
            let owner = repository
                .and_then(|r| r.get("owner_login"))
                .and_then(Value::as_str);
            let name = repository.and_then(|r| r.get("name")).and_then(Value::as_str);

            match (owner, name) {
                (Some(owner), Some(name)) if !owner.is_empty() && !name.is_empty() => {
                    let href = format!("/{}/{}", owner, name);
                    match normalize_candidate_url(&href, base_url) {
                        Ok(url) => Extracted::Found(url),
                        Err(e) => Extracted::Skip(format!("unusable repository '{}': {}", href, e)),
                    }
                }
                _ => Extracted::Skip("payload result has no owner_login/name".to_string()),
            }
        })
        .collect())
}

/// Parses a repository page into owner and language statistics
///
/// Percentages are returned as shown on the page; they are not rescaled.
///
/// # Returns
///
/// * `Ok(RepositoryDetails)` - Owner and/or language data was found
/// * `Err(ParseError)` - The page is empty or shows neither
pub fn parse_repository_page(body: &str) -> Result<RepositoryDetails, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    let document = Html::parse_document(body);
    let owner = extract_owner(&document)?;
    let language_stats = extract_language_stats(&document)?;

    if owner.is_none() && language_stats.is_none() {
        return Err(ParseError::Unrecognized(
            "no owner metadata and no language statistics".to_string(),
        ));
    }

    Ok(RepositoryDetails {
        owner,
        language_stats: language_stats.unwrap_or_default(),
    })
}

fn extract_owner(document: &Html) -> Result<Option<String>, ParseError> {
    let meta = selector(OWNER_META)?;
    let from_meta = document
        .select(&meta)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty());

    if let Some(owner) = from_meta {
        return Ok(Some(owner.to_string()));
    }

    for css in OWNER_ELEMENTS {
        let owner_selector = selector(css)?;
        let found = document
            .select(&owner_selector)
            .map(element_text)
            .find(|text| !text.is_empty());
        if found.is_some() {
            return Ok(found);
        }
    }

    Ok(None)
}

/// Finds the language widget and reads it
///
/// Returns `None` when the page has no language widget.
fn extract_language_stats(document: &Html) -> Result<Option<LanguageStats>, ParseError> {
    let graph_selector = selector(LEGACY_LANGUAGE_GRAPH)?;
    if let Some(graph) = document.select(&graph_selector).next() {
        let entry_selector = selector(LEGACY_LANGUAGE_ENTRY)?;
        let outcomes = graph
            .select(&entry_selector)
            .map(|entry| parse_language_label(entry.value().attr("aria-label").unwrap_or("")));
        return Ok(Some(collect_languages(outcomes)));
    }

    let Some(row) = find_language_row(document)? else {
        return Ok(None);
    };

    let item_selector = selector("li")?;
    let name_selector = selector("span.text-bold")?;
    let span_selector = selector("span")?;

    let outcomes = row.select(&item_selector).map(|item| {
        let name = item.select(&name_selector).next().map(element_text);
        let percent = item
            .select(&span_selector)
            .map(element_text)
            .find(|text| text.ends_with('%'));

        match (name, percent) {
            (Some(name), Some(percent)) if !name.is_empty() => match parse_percent(&percent) {
                Some(value) => Extracted::Found((name, value)),
                None => Extracted::Skip(format!("unreadable percentage '{}'", percent)),
            },
            _ => Extracted::Skip("language entry without name or percentage".to_string()),
        }
    });

    Ok(Some(collect_languages(outcomes)))
}

/// Picks the sidebar row holding the language list
///
/// The row headed "Languages" wins. Older layouts without row headings keep
/// the language list in the last row.
fn find_language_row(document: &Html) -> Result<Option<ElementRef<'_>>, ParseError> {
    let row_selector = selector(SIDEBAR_ROW)?;
    let heading_selector = selector("h2")?;

    let rows: Vec<ElementRef<'_>> = document.select(&row_selector).collect();

    let headed = rows.iter().find(|row| {
        row.select(&heading_selector)
            .any(|h| element_text(h).eq_ignore_ascii_case("languages"))
    });
    if let Some(row) = headed {
        return Ok(Some(*row));
    }

    let any_headings = rows
        .iter()
        .any(|row| row.select(&heading_selector).next().is_some());
    if any_headings {
        return Ok(None);
    }

    Ok(rows.last().copied())
}

fn collect_languages<I>(outcomes: I) -> LanguageStats
where
    I: Iterator<Item = Extracted<(String, f64)>>,
{
    let mut stats = LanguageStats::new();
    for outcome in outcomes {
        match outcome {
            Extracted::Found((name, percent)) => stats.insert(name, percent),
            Extracted::Skip(reason) => tracing::debug!(%reason, "Skipping language entry"),
        }
    }
    stats
}

/// Parses a legacy label such as `"Jupyter Notebook 30.1%"`
fn parse_language_label(label: &str) -> Extracted<(String, f64)> {
    let label = label.trim();
    let Some((name, percent)) = label.rsplit_once(char::is_whitespace) else {
        return Extracted::Skip(format!("unreadable language label '{}'", label));
    };

    let name = name.trim();
    match parse_percent(percent) {
        Some(value) if !name.is_empty() => Extracted::Found((name.to_string(), value)),
        _ => Extracted::Skip(format!("unreadable language label '{}'", label)),
    }
}

/// Parses `"52.0%"` or `"<0.1%"` into a percentage in 0..=100
fn parse_percent(text: &str) -> Option<f64> {
    let value: f64 = text
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('%')
        .trim()
        .parse()
        .ok()?;

    (0.0..=100.0).contains(&value).then_some(value)
}
