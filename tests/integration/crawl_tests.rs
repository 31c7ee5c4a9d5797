//! Integration tests for the crawler
//!
//! These tests use wiremock to create a mock GitHub and run the full crawl
//! cycle end-to-end: search pages, de-duplication, enrichment and output.

use github_crawler::config::Config;
use github_crawler::output::records_to_json;
use github_crawler::{crawl, Coordinator, CrawlerError, ProxyPool, SearchRequest, SearchType};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPOSITORY_PAGE: &str = include_str!("../fixtures/repository_dropbox.html");

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.crawler.base_url = base_url.to_string();
    config.crawler.request_delay_ms = 0;
    config.crawler.base_backoff_ms = 1;
    config.crawler.max_backoff_ms = 10;
    config.crawler.max_retries = 1;
    config.user_agent.crawler_name = "TestBot".to_string();
    config.user_agent.contact_email = "test@example.com".to_string();
    config
}

fn coordinator(config: &Config) -> Coordinator {
    Coordinator::from_config(config, Arc::new(ProxyPool::empty()))
        .expect("Failed to create coordinator")
}

fn repo_items(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<li class="repo-list-item"><div class="f4"><a class="v-align-middle" href="{}">{}</a></div></li>"#,
                href, href
            )
        })
        .collect();
    format!("<html><body><ul class=\"repo-list\">{}</ul></body></html>", items)
}

fn repository_page(owner: &str, language: &str) -> String {
    format!(
        r#"<html><head><meta name="octolytics-dimension-user_login" content="{}"></head>
        <body><div class="BorderGrid-row"><h2>Languages</h2><ul>
        <li><span class="text-bold">{}</span><span>100.0%</span></li>
        </ul></div></body></html>"#,
        owner, language
    )
}

async fn mount_search(server: &MockServer, query: &str, search_type: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", query))
        .and(query_param("type", search_type))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_dropbox_scenario_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_search(
        &mock_server,
        "openstack nova css",
        "repositories",
        repo_items(&["/atuldjadhav/DropBox-Cloud-Storage"]),
    )
    .await;
    mount_page(
        &mock_server,
        "/atuldjadhav/DropBox-Cloud-Storage",
        REPOSITORY_PAGE.to_string(),
    )
    .await;

    let config = create_test_config(&base_url);
    let request =
        SearchRequest::new(vec!["openstack", "nova", "css"], SearchType::Repositories).unwrap();
    let result = crawl(&config, &request).await.expect("Crawl failed");

    let json: serde_json::Value =
        serde_json::from_str(&records_to_json(&result.records).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "url": format!("{}/atuldjadhav/DropBox-Cloud-Storage", base_url),
            "extra": {
                "owner": "atuldjadhav",
                "language_stats": {"CSS": 52.0, "JavaScript": 47.2, "HTML": 0.8}
            }
        }])
    );
}

#[tokio::test]
async fn test_issue_search_never_enriches() {
    let mock_server = MockServer::start().await;

    mount_search(
        &mock_server,
        "python asyncio",
        "issues",
        r#"<div class="issue-list-item"><a class="Link--primary" href="/python/cpython/issues/1">one</a></div>
           <div class="issue-list-item"><a class="Link--primary" href="/python/cpython/issues/2">two</a></div>"#
            .to_string(),
    )
    .await;

    // Issue pages must never be fetched
    Mock::given(method("GET"))
        .and(path("/python/cpython/issues/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("issue"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let request = SearchRequest::new(vec!["python", "asyncio"], SearchType::Issues).unwrap();
    let result = coordinator(&config).crawl(&request).await.unwrap();

    assert_eq!(result.len(), 2);
    assert!(result.records.iter().all(|r| r.extra.is_none()));

    let json = records_to_json(&result.records).unwrap();
    assert!(!json.contains("extra"));

    mock_server.verify().await;
}

#[tokio::test]
async fn test_duplicates_fetched_and_emitted_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_search(
        &mock_server,
        "dup",
        "repositories",
        repo_items(&["/test/repo", "/test/repo/", "/test/repo#readme"]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/test/repo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(repository_page("test", "Rust")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let request = SearchRequest::new(vec!["dup"], SearchType::Repositories).unwrap();
    let result = coordinator(&config).crawl(&request).await.unwrap();

    assert_eq!(result.urls(), vec![format!("{}/test/repo", base_url)]);
    assert_eq!(result.summary.duplicates_suppressed, 2);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_discovery_order_survives_slow_enrichment() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_search(
        &mock_server,
        "order",
        "repositories",
        repo_items(&["/first/repo", "/second/repo", "/third/repo"]),
    )
    .await;

    // The first repository answers last
    Mock::given(method("GET"))
        .and(path("/first/repo"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(repository_page("first", "C"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second/repo"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(repository_page("second", "Go"))
                .set_delay(Duration::from_millis(150)),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/third/repo", repository_page("third", "Rust")).await;

    let config = create_test_config(&base_url);
    let request = SearchRequest::new(vec!["order"], SearchType::Repositories).unwrap();
    let result = coordinator(&config).crawl(&request).await.unwrap();

    assert_eq!(
        result.urls(),
        vec![
            format!("{}/first/repo", base_url),
            format!("{}/second/repo", base_url),
            format!("{}/third/repo", base_url),
        ]
    );
    let owners: Vec<_> = result.records.iter().map(|r| r.owner()).collect();
    assert_eq!(owners, vec![Some("first"), Some("second"), Some("third")]);
}

#[tokio::test]
async fn test_failing_enrichment_still_emits_record() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_search(
        &mock_server,
        "flaky",
        "repositories",
        repo_items(&["/down/repo", "/up/repo"]),
    )
    .await;

    // max_retries = 1 gives two attempts before the record degrades
    Mock::given(method("GET"))
        .and(path("/down/repo"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/up/repo", repository_page("up", "Rust")).await;

    let config = create_test_config(&base_url);
    let request = SearchRequest::new(vec!["flaky"], SearchType::Repositories).unwrap();
    let result = coordinator(&config).crawl(&request).await.unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.records[0].url, format!("{}/down/repo", base_url));
    assert!(result.records[0].extra.is_none());
    assert_eq!(result.records[1].owner(), Some("up"));
    assert_eq!(result.summary.degraded, 1);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_search_failure_fails_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri());
    let request = SearchRequest::new(vec!["anything"], SearchType::Repositories).unwrap();
    let error = coordinator(&config).crawl(&request).await.unwrap_err();

    match error {
        CrawlerError::SearchFetch { attempts, .. } => assert_eq!(attempts, 2),
        other => panic!("unexpected error: {:?}", other),
    }

    mock_server.verify().await;
}

#[tokio::test]
async fn test_pagination_reads_later_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Later pages first so they win over the page-1 mock
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(repo_items(&["/a/repo", "/b/repo"])),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>none</body></html>"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(repo_items(&["/c/repo"])))
        .expect(0)
        .mount(&mock_server)
        .await;
    mount_search(&mock_server, "paged", "repositories", repo_items(&["/a/repo"])).await;

    for owner in ["a", "b"] {
        mount_page(&mock_server, &format!("/{}/repo", owner), repository_page(owner, "Rust")).await;
    }

    let mut config = create_test_config(&base_url);
    config.crawler.search_pages = 5;
    let request = SearchRequest::new(vec!["paged"], SearchType::Repositories).unwrap();
    let result = coordinator(&config).crawl(&request).await.unwrap();

    assert_eq!(
        result.urls(),
        vec![format!("{}/a/repo", base_url), format!("{}/b/repo", base_url)]
    );
    assert_eq!(result.summary.pages_fetched, 3);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_coordinator_is_reusable() {
    let mock_server = MockServer::start().await;

    mount_search(
        &mock_server,
        "wiki",
        "wikis",
        r#"<div class="wiki-list-item"><a class="Link--primary" href="/o/r/wiki/Home">Home</a></div>"#
            .to_string(),
    )
    .await;

    let config = create_test_config(&mock_server.uri());
    let coordinator = coordinator(&config);
    let request = SearchRequest::new(vec!["wiki"], SearchType::Wikis).unwrap();

    let first = coordinator.crawl(&request).await.unwrap();
    let second = coordinator.crawl(&request).await.unwrap();

    assert_eq!(first.records, second.records);
    assert_eq!(second.summary.duplicates_suppressed, 0);
}
