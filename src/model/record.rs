use crate::output::CrawlSummary;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One search hit as emitted by a crawl
///
/// `extra` is only present for repository hits whose enrichment succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RepositoryExtra>,
}

impl SearchRecord {
    /// A record without enrichment data (issues, wikis, degraded repositories)
    pub fn bare(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: None,
        }
    }

    pub fn enriched(url: impl Into<String>, extra: RepositoryExtra) -> Self {
        Self {
            url: url.into(),
            extra: Some(extra),
        }
    }

    /// Owner of the repository, if enrichment succeeded
    pub fn owner(&self) -> Option<&str> {
        self.extra.as_ref().map(|e| e.owner.as_str())
    }

    /// Language breakdown; empty when the record was not enriched
    pub fn language_stats(&self) -> LanguageStats {
        self.extra
            .as_ref()
            .map(|e| e.language_stats.clone())
            .unwrap_or_default()
    }
}

/// Enrichment data collected from a repository page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryExtra {
    pub owner: String,

    #[serde(default)]
    pub language_stats: LanguageStats,
}

/// Language name to percentage mapping, in the order the page lists them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LanguageStats(Vec<(String, f64)>);

impl LanguageStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the percentage for a language, replacing an earlier value
    pub fn insert(&mut self, language: impl Into<String>, percent: f64) {
        let language = language.into();
        match self.0.iter_mut().find(|(name, _)| *name == language) {
            Some(entry) => entry.1 = percent,
            None => self.0.push((language, percent)),
        }
    }

    pub fn get(&self, language: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == language)
            .map(|(_, percent)| *percent)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, percent)| (name.as_str(), *percent))
    }

    /// Sum of all percentages
    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, percent)| percent).sum()
    }

    /// Rescales the percentages so they sum to 100, rounded to one decimal
    ///
    /// Returns an unchanged copy when the total is zero.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 {
            return self.clone();
        }

        self.0
            .iter()
            .map(|(name, percent)| {
                let scaled = (percent / total * 1000.0).round() / 10.0;
                (name.clone(), scaled)
            })
            .collect()
    }
}

impl FromIterator<(String, f64)> for LanguageStats {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut stats = Self::new();
        for (name, percent) in iter {
            stats.insert(name, percent);
        }
        stats
    }
}

impl Serialize for LanguageStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, percent) in &self.0 {
            map.serialize_entry(name, percent)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LanguageStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatsVisitor;

        impl<'de> Visitor<'de> for StatsVisitor {
            type Value = LanguageStats;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of language name to percentage")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut stats = LanguageStats::new();
                while let Some((name, percent)) = access.next_entry::<String, f64>()? {
                    stats.insert(name, percent);
                }
                Ok(stats)
            }
        }

        deserializer.deserialize_map(StatsVisitor)
    }
}

/// The outcome of one crawl: records in discovery order plus a summary
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub records: Vec<SearchRecord>,
    pub summary: CrawlSummary,
}

impl CrawlResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.url.as_str()).collect()
    }
}
