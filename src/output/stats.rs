//! Crawl statistics
//!
//! The coordinator fills a `CrawlSummary` while it works; the binary prints
//! it once the results are written.

use std::time::Duration;

/// Counters describing one crawl
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlSummary {
    /// Search result pages fetched and parsed
    pub pages_fetched: u32,

    /// Candidate URLs extracted, repeats included
    pub candidates_found: usize,

    /// Result items skipped because they were malformed
    pub candidates_skipped: usize,

    /// Candidates dropped because their URL was already accepted
    pub duplicates_suppressed: usize,

    /// Records emitted
    pub records: usize,

    /// Repository records carrying owner and language data
    pub enriched: usize,

    /// Repository records emitted without enrichment data
    pub degraded: usize,

    pub duration: Duration,
}

impl CrawlSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share of enrichment attempts that succeeded, as a percentage
    ///
    /// Returns 100 when nothing needed enrichment.
    pub fn enrichment_rate(&self) -> f64 {
        let attempted = self.enriched + self.degraded;
        if attempted == 0 {
            return 100.0;
        }
        (self.enriched as f64 / attempted as f64) * 100.0
    }
}

/// Prints a crawl summary to stdout
///
/// Goes to stderr instead when `to_stderr` is set, so the summary does not
/// mix with results written to stdout.
pub fn print_summary(summary: &CrawlSummary, to_stderr: bool) {
    let text = format_summary(summary);
    if to_stderr {
        eprint!("{}", text);
    } else {
        print!("{}", text);
    }
}

/// Formats a crawl summary as plain text
pub fn format_summary(summary: &CrawlSummary) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Summary ===\n\n");
    out.push_str(&format!("  Search pages fetched: {}\n", summary.pages_fetched));
    out.push_str(&format!("  Candidates found: {}\n", summary.candidates_found));
    out.push_str(&format!("  Candidates skipped: {}\n", summary.candidates_skipped));
    out.push_str(&format!(
        "  Duplicates suppressed: {}\n",
        summary.duplicates_suppressed
    ));
    out.push_str(&format!("  Records emitted: {}\n", summary.records));

    if summary.enriched + summary.degraded > 0 {
        out.push_str(&format!(
            "  Enriched: {} / Degraded: {} ({:.1}% enriched)\n",
            summary.enriched,
            summary.degraded,
            summary.enrichment_rate()
        ));
    }

    out.push_str(&format!(
        "  Duration: {:.2}s\n",
        summary.duration.as_secs_f64()
    ));

    out
}
