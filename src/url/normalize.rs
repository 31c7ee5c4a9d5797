use crate::UrlError;
use url::Url;

/// Query parameters that never identify a result
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "ref_cta",
    "ref_loc",
    "ref_page",
];

/// Resolves a result link against the search base and normalizes it
///
/// Two hrefs pointing at the same result normalize to the same URL, which
/// is what de-duplication keys on.
///
/// # Normalization Steps
///
/// 1. Resolve `href` against `base` (relative links are the norm on GitHub)
/// 2. Reject non-HTTP(S) schemes and host-less URLs
/// 3. Lowercase the host and strip a `www.` prefix
/// 4. Remove dot segments, duplicate and trailing slashes
/// 5. Drop the fragment and tracking query parameters; sort the rest
///
/// # Examples
///
/// ```
/// use github_crawler::url::normalize_candidate_url;
/// use url::Url;
///
/// let base = Url::parse("https://github.com").unwrap();
/// let url = normalize_candidate_url("/atuldjadhav/DropBox-Cloud-Storage/", &base).unwrap();
/// assert_eq!(url.as_str(), "https://github.com/atuldjadhav/DropBox-Cloud-Storage");
/// ```
pub fn normalize_candidate_url(href: &str, base: &Url) -> Result<Url, UrlError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Malformed("empty link".to_string()));
    }

    let mut url = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("'{}': {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str() {
        let mut normalized_host = host.to_lowercase();
        if let Some(stripped) = normalized_host.strip_prefix("www.") {
            normalized_host = stripped.to_string();
        }

        url.set_host(Some(&normalized_host))
            .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
    } else {
        return Err(UrlError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Key under which two normalized candidates count as the same hit
///
/// GitHub resolves owner and repository names case-insensitively, so the
/// first two path segments are case-folded. Anything after them (an issue
/// number, a wiki page name) keeps its case.
pub fn dedup_key(url: &Url) -> String {
    let mut key = url.clone();
    let path = url
        .path()
        .split('/')
        .enumerate()
        .map(|(i, segment)| match i {
            1 | 2 => segment.to_lowercase(),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");
    key.set_path(&path);
    key.into()
}

/// Removes dot segments, empty segments and the trailing slash
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
