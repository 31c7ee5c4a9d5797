//! Search request definitions
//!
//! A search request names the keywords to look for and the category of
//! GitHub content to search.

use crate::CrawlerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The category of GitHub content being searched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchType {
    #[serde(alias = "repositories", alias = "REPOSITORIES")]
    Repositories,

    #[serde(alias = "issues", alias = "ISSUES")]
    Issues,

    #[serde(alias = "wikis", alias = "WIKIS")]
    Wikis,
}

impl SearchType {
    /// Value of the `type` query parameter on GitHub's search page
    pub fn query_value(&self) -> &'static str {
        match self {
            Self::Repositories => "repositories",
            Self::Issues => "issues",
            Self::Wikis => "wikis",
        }
    }

    /// Returns true if records of this type get the enrichment pass
    pub fn is_enriched(&self) -> bool {
        matches!(self, Self::Repositories)
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Repositories => "Repositories",
            Self::Issues => "Issues",
            Self::Wikis => "Wikis",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repositories" | "repos" | "repo" => Ok(Self::Repositories),
            "issues" | "issue" => Ok(Self::Issues),
            "wikis" | "wiki" => Ok(Self::Wikis),
            other => Err(format!(
                "unknown search type '{}' (expected Repositories, Issues or Wikis)",
                other
            )),
        }
    }
}

/// An immutable search request: keywords plus search type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    keywords: Vec<String>,
    search_type: SearchType,
}

impl SearchRequest {
    /// Creates a search request
    ///
    /// Blank keywords are dropped and the rest are trimmed. A request
    /// without any remaining keyword is rejected.
    ///
    /// # Example
    ///
    /// ```
    /// use github_crawler::{SearchRequest, SearchType};
    ///
    /// let request = SearchRequest::new(vec!["python", " asyncio "], SearchType::Issues).unwrap();
    /// assert_eq!(request.query(), "python asyncio");
    /// ```
    pub fn new<I, S>(keywords: I, search_type: SearchType) -> Result<Self, CrawlerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keywords.is_empty() {
            return Err(CrawlerError::InvalidRequest(
                "at least one non-empty keyword is required".to_string(),
            ));
        }

        Ok(Self {
            keywords,
            search_type,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    /// The search query sent to GitHub (keywords joined by spaces)
    pub fn query(&self) -> String {
        self.keywords.join(" ")
    }
}
