//! Data model shared by the crawler, the parser and the output writers
//!
//! - `SearchRequest` / `SearchType`: what to search for
//! - `SearchRecord` / `RepositoryExtra` / `LanguageStats`: what a crawl emits
//! - `CrawlResult`: the ordered records of one crawl plus its summary

mod record;
mod search;

pub use record::{CrawlResult, LanguageStats, RepositoryExtra, SearchRecord};
pub use search::{SearchRequest, SearchType};
