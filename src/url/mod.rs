//! URL handling module
//!
//! This module builds GitHub search URLs and normalizes result links so they
//! can be de-duplicated.

mod normalize;

use crate::model::SearchRequest;
use crate::UrlError;
use url::Url;

pub use normalize::{dedup_key, normalize_candidate_url};

/// Builds the URL of one search results page
///
/// Page 1 carries no page parameter; later pages add `p=N`.
///
/// # Examples
///
/// ```
/// use github_crawler::url::build_search_url;
/// use github_crawler::{SearchRequest, SearchType};
/// use url::Url;
///
/// let base = Url::parse("https://github.com").unwrap();
/// let request = SearchRequest::new(vec!["python", "asyncio"], SearchType::Repositories).unwrap();
/// let url = build_search_url(&base, &request, 1).unwrap();
/// assert_eq!(url.as_str(), "https://github.com/search?q=python+asyncio&type=repositories");
/// ```
pub fn build_search_url(base: &Url, request: &SearchRequest, page: u32) -> Result<Url, UrlError> {
    let mut url = base
        .join("/search")
        .map_err(|e| UrlError::Malformed(format!("Cannot build search URL: {}", e)))?;

    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("q", &request.query());
        pairs.append_pair("type", request.search_type().query_value());
        if page > 1 {
            pairs.append_pair("p", &page.to_string());
        }
    }

    Ok(url)
}

/// Owner segment of a repository URL (`https://github.com/<owner>/<repo>`)
pub fn owner_from_repository_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    segments.next()?;
    Some(owner.to_string())
}
