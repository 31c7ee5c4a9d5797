//! Integration tests for the rate-limited fetcher
//!
//! These tests use wiremock to stand in for GitHub and check retry bounds,
//! failure classification, admission control and proxy rotation.

use github_crawler::config::Config;
use github_crawler::crawler::{FetchStatus, Fetcher, RetryPolicy};
use github_crawler::{PageFetcher, ProxyPool};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no politeness delay and tiny backoff
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.contact_email = "test@example.com".to_string();
    config.crawler.request_delay_ms = 0;
    config.crawler.base_backoff_ms = 1;
    config.crawler.max_backoff_ms = 10;
    config.crawler.request_timeout_secs = 5;
    config
}

fn direct_fetcher(config: &Config) -> Fetcher {
    Fetcher::new(config, Arc::new(ProxyPool::empty())).expect("Failed to build fetcher")
}

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn test_successful_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher
        .fetch(&format!("{}/page", mock_server.uri()), &policy(3))
        .await;

    assert_eq!(result.status, FetchStatus::Ok);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.status_code, Some(200));
    assert!(result.body.unwrap().contains("ok"));
}

#[tokio::test]
async fn test_retry_bound_on_transient_errors() {
    let mock_server = MockServer::start().await;

    // max_retries = 2 allows exactly three attempts
    Mock::given(method("GET"))
        .and(path("/unavailable"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher
        .fetch(&format!("{}/unavailable", mock_server.uri()), &policy(2))
        .await;

    assert_eq!(result.status, FetchStatus::TerminalError);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.status_code, Some(503));
    assert!(result.body.is_none());
    assert!(result.reason.unwrap().contains("retries exhausted"));

    mock_server.verify().await;
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()), &policy(3))
        .await;

    assert_eq!(result.status, FetchStatus::TerminalError);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.status_code, Some(404));

    mock_server.verify().await;
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>results</html>"))
        .mount(&mock_server)
        .await;

    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher
        .fetch(&format!("{}/search", mock_server.uri()), &policy(3))
        .await;

    assert_eq!(result.status, FetchStatus::Ok);
    assert_eq!(result.attempts, 2);
}

#[tokio::test]
async fn test_exhausted_rate_limit_403_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-remaining", "0"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher
        .fetch(&format!("{}/limited", mock_server.uri()), &policy(1))
        .await;

    assert_eq!(result.status, FetchStatus::TerminalError);
    assert_eq!(result.attempts, 2);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_plain_403_is_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher
        .fetch(&format!("{}/forbidden", mock_server.uri()), &policy(3))
        .await;

    assert_eq!(result.status, FetchStatus::TerminalError);
    assert_eq!(result.attempts, 1);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_empty_body_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_string("   "))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher
        .fetch(&format!("{}/blank", mock_server.uri()), &policy(2))
        .await;

    assert_eq!(result.status, FetchStatus::TerminalError);
    assert_eq!(result.attempts, 3);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_malformed_url_makes_no_request() {
    let fetcher = direct_fetcher(&create_test_config());
    let result = fetcher.fetch("not a url", &policy(3)).await;

    assert_eq!(result.status, FetchStatus::TerminalError);
    assert_eq!(result.attempts, 0);
}

#[tokio::test]
async fn test_admission_bounds_in_flight_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html>slow</html>")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(6)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.crawler.max_concurrent_requests = 2;
    let fetcher = Arc::new(direct_fetcher(&config));
    let url = format!("{}/slow", mock_server.uri());

    let start = Instant::now();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let fetcher = Arc::clone(&fetcher);
            let url = url.clone();
            tokio::spawn(async move { fetcher.fetch(&url, &policy(0)).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.status, FetchStatus::Ok);
    }

    // Six requests two at a time take at least three rounds
    assert!(start.elapsed() >= Duration::from_millis(550));
    assert_eq!(fetcher.available_permits(), 2);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_requests_go_through_proxy() {
    // The mock server plays the proxy; the target itself is unreachable
    let proxy_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>via proxy</html>"))
        .expect(1)
        .mount(&proxy_server)
        .await;

    let pool = Arc::new(ProxyPool::new(vec![proxy_server.uri()]).unwrap());
    let fetcher = Fetcher::new(&create_test_config(), Arc::clone(&pool)).unwrap();

    let result = fetcher.fetch("http://127.0.0.1:9/page", &policy(0)).await;

    assert_eq!(result.status, FetchStatus::Ok);
    assert_eq!(result.body.as_deref(), Some("<html>via proxy</html>"));
    assert_eq!(pool.healthy_count(), 1);

    proxy_server.verify().await;
}

#[tokio::test]
async fn test_dead_proxy_is_marked_unhealthy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>direct</html>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    // Nothing listens on port 1
    let pool = Arc::new(ProxyPool::new(vec!["127.0.0.1:1"]).unwrap());
    let fetcher = Fetcher::new(&create_test_config(), Arc::clone(&pool)).unwrap();

    let result = fetcher
        .fetch(&format!("{}/page", mock_server.uri()), &policy(1))
        .await;

    assert_eq!(result.status, FetchStatus::TerminalError);
    assert_eq!(result.attempts, 2);
    assert_eq!(pool.healthy_count(), 0);
    assert_eq!(pool.len(), 1);

    mock_server.verify().await;
}

/// Starts a mock server that answers every GET, to be used as a proxy
async fn live_proxy() -> MockServer {
    let proxy_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>via proxy</html>"))
        .mount(&proxy_server)
        .await;
    proxy_server
}

#[tokio::test]
async fn test_retry_rotates_to_next_proxy() {
    let proxy_server = live_proxy().await;

    // The dead endpoint comes first in rotation
    let pool = Arc::new(ProxyPool::new(vec!["127.0.0.1:1".to_string(), proxy_server.uri()]).unwrap());
    let fetcher = Fetcher::new(&create_test_config(), Arc::clone(&pool)).unwrap();

    let result = fetcher.fetch("http://127.0.0.1:9/page", &policy(1)).await;

    assert_eq!(result.status, FetchStatus::Ok);
    assert_eq!(result.attempts, 2);
    let health: Vec<bool> = pool.snapshot().iter().map(|e| e.healthy).collect();
    assert_eq!(health, vec![false, true]);
}

#[tokio::test]
async fn test_queued_requests_skip_proxy_that_failed_while_waiting() {
    let proxy_server = live_proxy().await;

    let pool = Arc::new(ProxyPool::new(vec!["127.0.0.1:1".to_string(), proxy_server.uri()]).unwrap());
    let mut config = create_test_config();
    config.crawler.max_concurrent_requests = 1;
    let fetcher = Arc::new(Fetcher::new(&config, Arc::clone(&pool)).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { fetcher.fetch("http://127.0.0.1:9/page", &policy(0)).await })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap().status);
    }

    // Only the request holding the first slot goes through the dead proxy
    let failures = statuses
        .iter()
        .filter(|s| **s == FetchStatus::TerminalError)
        .count();
    assert_eq!(failures, 1, "statuses: {:?}", statuses);
    assert_eq!(pool.healthy_count(), 1);
    assert_eq!(fetcher.available_permits(), 1);
}
