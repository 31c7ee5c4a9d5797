//! github-crawler main entry point
//!
//! This is the command-line interface for the GitHub search crawler.

use anyhow::{bail, Context};
use clap::Parser;
use github_crawler::config::{load_config_with_hash, validate, Config};
use github_crawler::input::{load_input, CrawlInput};
use github_crawler::output::{print_summary, CrawlSummary, JsonFileSink, ResultSink, StdoutSink};
use github_crawler::url::build_search_url;
use github_crawler::{Coordinator, ProxyPool, SearchRecord, SearchRequest, SearchType};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// github-crawler: keyword crawler for GitHub search
///
/// Searches GitHub for repositories, issues or wiki pages matching the given
/// keywords, optionally through rotating proxies, and writes the hits as
/// JSON. Repository hits are enriched with their owner and language
/// breakdown.
#[derive(Parser, Debug)]
#[command(name = "github-crawler")]
#[command(version)]
#[command(about = "Keyword crawler for GitHub search", long_about = None)]
struct Cli {
    /// Keywords to search for
    #[arg(value_name = "KEYWORDS", required_unless_present = "input")]
    keywords: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// JSON input file with keywords, proxies and type, or records to re-emit
    #[arg(short, long, value_name = "FILE", conflicts_with = "keywords")]
    input: Option<PathBuf>,

    /// Search type: repositories, issues or wikis
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "repositories")]
    search_type: SearchType,

    /// Proxy endpoint (host:port or URL); may be repeated
    #[arg(short, long = "proxy", value_name = "PROXY")]
    proxies: Vec<String>,

    /// Number of search result pages to read
    #[arg(long, value_name = "N")]
    pages: Option<u32>,

    /// Directory result files are written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Write results to stdout instead of a file
    #[arg(long)]
    stdout: bool,

    /// Validate config and show what would be fetched without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// What the run will do once inputs are resolved
enum Job {
    Crawl(SearchRequest),
    PassThrough(Vec<SearchRecord>),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --stdout output stays clean
    setup_logging(cli.verbose, cli.quiet);

    let mut config = load_configuration(&cli)?;

    let job = match &cli.input {
        Some(path) => {
            tracing::info!("Loading input from: {}", path.display());
            match load_input(path).with_context(|| format!("reading {}", path.display()))? {
                CrawlInput::Request(input) => {
                    config.proxy.endpoints.extend(input.proxies.iter().cloned());
                    Job::Crawl(input.to_request()?)
                }
                CrawlInput::Records(records) => Job::PassThrough(records),
            }
        }
        None => Job::Crawl(SearchRequest::new(&cli.keywords, cli.search_type)?),
    };

    config.proxy.endpoints.extend(cli.proxies.iter().cloned());
    validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        return handle_dry_run(&config, &job);
    }

    let sink: Box<dyn ResultSink> = if cli.stdout {
        Box::new(StdoutSink)
    } else {
        Box::new(JsonFileSink::new(&config.output.directory))
    };

    match job {
        Job::Crawl(request) => handle_crawl(&config, &request, sink.as_ref(), &cli).await,
        Job::PassThrough(records) => handle_pass_through(records, sink.as_ref(), &cli),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("github_crawler=info,warn"),
            1 => EnvFilter::new("github_crawler=debug,info"),
            2 => EnvFilter::new("github_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file if one was given, then applies CLI overrides
fn load_configuration(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::debug!("No configuration file given; using defaults");
            Config::default()
        }
    };

    if let Some(pages) = cli.pages {
        config.crawler.search_pages = pages;
    }

    if let Some(directory) = &cli.output_dir {
        config.output.directory = directory.display().to_string();
    }

    Ok(config)
}

/// Handles the --dry-run mode: shows the effective settings and search URLs
fn handle_dry_run(config: &Config, job: &Job) -> anyhow::Result<()> {
    println!("=== github-crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Max retries: {}", config.crawler.max_retries);
    println!(
        "  Backoff: {}ms base, {}ms max",
        config.crawler.base_backoff_ms, config.crawler.max_backoff_ms
    );
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Search pages: {}", config.crawler.search_pages);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.user_agent_string());

    println!("\nProxies ({}, mode {:?}):", config.proxy.endpoints.len(), config.proxy.mode);
    for endpoint in &config.proxy.endpoints {
        println!("  - {}", endpoint);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);

    match job {
        Job::Crawl(request) => {
            let base = Url::parse(&config.crawler.base_url)?;
            println!("\nSearch ({}): {}", request.search_type(), request.query());
            for page in 1..=config.crawler.search_pages {
                println!("  * {}", build_search_url(&base, request, page)?);
            }
            println!("\n✓ Configuration is valid");
        }
        Job::PassThrough(records) => {
            println!("\n✓ Input holds {} valid record(s); they would be re-emitted", records.len());
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    request: &SearchRequest,
    sink: &dyn ResultSink,
    cli: &Cli,
) -> anyhow::Result<()> {
    let pool = Arc::new(ProxyPool::new(&config.proxy.endpoints)?);
    tracing::info!(
        "Search: '{}' ({}), proxies: {}",
        request.query(),
        request.search_type(),
        pool.len()
    );

    let coordinator = Coordinator::from_config(config, pool)?;

    let result = match coordinator.crawl(request).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            bail!(e);
        }
    };

    if let Some(path) = sink.write(&result.records)? {
        if !cli.quiet {
            println!("✓ Results written to: {}", path.display());
        }
    }

    if !cli.quiet {
        print_summary(&result.summary, cli.stdout);
    }

    Ok(())
}

/// Handles an input file of records: re-emits them unchanged
fn handle_pass_through(
    records: Vec<SearchRecord>,
    sink: &dyn ResultSink,
    cli: &Cli,
) -> anyhow::Result<()> {
    tracing::info!("Re-emitting {} record(s) from input", records.len());

    if let Some(path) = sink.write(&records)? {
        if !cli.quiet {
            println!("✓ Results written to: {}", path.display());
        }
    }

    if !cli.quiet {
        let summary = CrawlSummary {
            records: records.len(),
            enriched: records.iter().filter(|r| r.extra.is_some()).count(),
            ..CrawlSummary::default()
        };
        print_summary(&summary, cli.stdout);
    }

    Ok(())
}
