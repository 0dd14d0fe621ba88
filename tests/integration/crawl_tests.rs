//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end against a temporary output directory.

use site_corpus::config::Config;
use site_corpus::crawler::{crawl, CrawlOutcome};
use site_corpus::output::{ErrorRecord, MappingRecord};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server into `dir`
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.seed_url = format!("{}/", server.uri());
    config.crawler.domain = "127.0.0.1".to_string();
    config.politeness.user_agent = "TestBot/1.0 (+https://example.edu/bot)".to_string();
    config.politeness.rate_limit_seconds = 0.0;
    config.politeness.backoff_base_seconds = 0.0;
    config.politeness.backoff_max_seconds = 0.0;
    config.output.base_dir = dir.to_path_buf();
    config
}

async fn run_crawl(config: Config) -> CrawlOutcome {
    let (_tx, rx) = watch::channel(false);
    crawl(config, false, rx).await.expect("crawl should start")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

fn page(text: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
        text, text, anchors
    )
}

fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn frontier_urls(dir: &Path) -> Vec<String> {
    let content = fs::read_to_string(dir.join("frontier.json")).unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
    entries
        .iter()
        .map(|e| e["url"].as_str().unwrap().to_string())
        .collect()
}

fn mapping(dir: &Path) -> Vec<MappingRecord> {
    read_lines(&dir.join("mapping.jsonl"))
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_page_cap_stops_in_bfs_order() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(&server, "/", &page("Home", &["/a", "/b", "https://other.org/"])).await;
    mount_page(&server, "/a", &page("Page A", &[])).await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page("Page B", &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawler.max_pages = 2;

    let outcome = run_crawl(config).await;
    assert_eq!(outcome, CrawlOutcome::LimitReached);
    assert_eq!(outcome.exit_code(), 0);

    let seen = read_lines(&dir.path().join("seen.txt"));
    assert_eq!(seen, vec![format!("{}/", base), format!("{}/a", base)]);

    let frontier = frontier_urls(dir.path());
    assert_eq!(frontier, vec![format!("{}/b", base)]);

    let seen_text = fs::read_to_string(dir.path().join("seen.txt")).unwrap();
    let frontier_text = fs::read_to_string(dir.path().join("frontier.json")).unwrap();
    assert!(!seen_text.contains("other.org"));
    assert!(!frontier_text.contains("other.org"));
}

#[tokio::test]
async fn test_full_crawl_writes_corpus() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_page(
        &server,
        "/",
        r#"<html lang="en"><head><title>Home</title>
           <meta name="description" content="The front page">
           <link rel="stylesheet" href="/site.css"></head>
           <body><h1>Welcome</h1><p>Front page text</p>
           <img src="/logo.png"><a href="/about">About</a></body></html>"#,
    )
    .await;
    mount_page(&server, "/about", &page("About us", &["/"])).await;

    let dir = TempDir::new().unwrap();
    let outcome = run_crawl(create_test_config(&server, dir.path())).await;
    assert_eq!(outcome, CrawlOutcome::Complete);

    let records = mapping(dir.path());
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].url, format!("{}/", base));
    assert_eq!(records[0].title.as_deref(), Some("Home"));

    let html = dir.path().join("pages").join(format!("{}.html", records[0].html_key));
    assert!(fs::read_to_string(html).unwrap().contains("Front page text"));

    let json = dir.path().join("json").join(format!("{}.json", records[0].json_key));
    let record: serde_json::Value = serde_json::from_str(&fs::read_to_string(json).unwrap()).unwrap();
    assert_eq!(record["h1"], "Welcome");
    assert_eq!(record["meta_description"], "The front page");
    assert_eq!(record["language"], "en");
    assert_eq!(record["status"], 200);

    let assets = read_lines(&dir.path().join("assets.jsonl"));
    assert_eq!(assets.len(), 2);
    assert!(assets.iter().any(|a| a.contains("logo.png") && a.contains("\"image\"")));
    assert!(assets.iter().any(|a| a.contains("site.css") && a.contains("\"stylesheet\"")));

    assert!(frontier_urls(dir.path()).is_empty());
    assert!(read_lines(&dir.path().join("errors.jsonl")).is_empty());
}

#[tokio::test]
async fn test_foreign_hosts_never_queued() {
    let server = MockServer::start().await;
    let port = server.address().port();
    let foreign = format!("http://localhost:{}/elsewhere", port);
    mount_page(&server, "/", &page("Home", &[&foreign, "http://other.example.com/"])).await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page("Elsewhere", &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = run_crawl(create_test_config(&server, dir.path())).await;
    assert_eq!(outcome, CrawlOutcome::Complete);

    let seen = read_lines(&dir.path().join("seen.txt"));
    assert_eq!(seen.len(), 1);
}

#[tokio::test]
async fn test_robots_disallow_respected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", &page("Home", &["/public", "/private/secret"])).await;
    mount_page(&server, "/public", &page("Public", &[])).await;
    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page("Secret", &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let outcome = run_crawl(create_test_config(&server, dir.path())).await;
    assert_eq!(outcome, CrawlOutcome::Complete);

    let seen = fs::read_to_string(dir.path().join("seen.txt")).unwrap();
    assert!(seen.contains("/public"));
    assert!(!seen.contains("/private"));
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/", &page("Home", &[])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawler.respect_robots = false;

    assert_eq!(run_crawl(config).await, CrawlOutcome::Complete);
    assert_eq!(read_lines(&dir.path().join("seen.txt")).len(), 1);
}

#[tokio::test]
async fn test_duplicate_content_stored_once() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &page("Home", &["/a", "/b"])).await;
    mount_page(&server, "/a", &page("Same text", &[])).await;
    mount_page(&server, "/b", &page("Same text", &[])).await;

    let dir = TempDir::new().unwrap();
    let outcome = run_crawl(create_test_config(&server, dir.path())).await;
    assert_eq!(outcome, CrawlOutcome::Complete);

    let records = mapping(dir.path());
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].json_key, records[2].json_key);
    assert_ne!(records[1].html_key, records[2].html_key);

    assert_eq!(fs::read_dir(dir.path().join("json")).unwrap().count(), 2);
    assert_eq!(fs::read_dir(dir.path().join("pages")).unwrap().count(), 3);
    assert_eq!(read_lines(&dir.path().join("seen.txt")).len(), 3);
}

#[tokio::test]
async fn test_equivalent_urls_fetched_once() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        &page("Home", &["/news/", "/news#top", "/news?utm_source=mail", "/news"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page("News", &[]), "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    assert_eq!(
        run_crawl(create_test_config(&server, dir.path())).await,
        CrawlOutcome::Complete
    );
    assert_eq!(read_lines(&dir.path().join("seen.txt")).len(), 2);
}

#[tokio::test]
async fn test_rerun_after_complete_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page("Home", &["/a"]), "text/html"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/a", &page("Page A", &[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    assert_eq!(run_crawl(config.clone()).await, CrawlOutcome::Complete);
    let seen_before = fs::read_to_string(dir.path().join("seen.txt")).unwrap();
    let mapping_before = read_lines(&dir.path().join("mapping.jsonl")).len();

    assert_eq!(run_crawl(config).await, CrawlOutcome::Complete);
    let seen_after = fs::read_to_string(dir.path().join("seen.txt")).unwrap();

    assert_eq!(seen_before, seen_after);
    assert_eq!(read_lines(&dir.path().join("mapping.jsonl")).len(), mapping_before);
}

#[tokio::test]
async fn test_resume_fetches_each_url_once() {
    let server = MockServer::start().await;
    for (route, body) in [
        ("/", page("Home", &["/a", "/b", "/c"])),
        ("/a", page("Page A", &[])),
        ("/b", page("Page B", &[])),
        ("/c", page("Page C", &[])),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .expect(1)
            .mount(&server)
            .await;
    }

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawler.max_pages = 2;
    assert_eq!(run_crawl(config.clone()).await, CrawlOutcome::LimitReached);

    config.crawler.max_pages = 0;
    assert_eq!(run_crawl(config).await, CrawlOutcome::Complete);

    let seen = read_lines(&dir.path().join("seen.txt"));
    assert_eq!(seen.len(), 4);
    assert_eq!(mapping(dir.path()).len(), 4);
}

#[tokio::test]
async fn test_client_error_not_retried() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &page("Home", &["/gone"])).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    assert_eq!(
        run_crawl(create_test_config(&server, dir.path())).await,
        CrawlOutcome::Complete
    );

    let errors = read_lines(&dir.path().join("errors.jsonl"));
    assert_eq!(errors.len(), 1);
    let record: ErrorRecord = serde_json::from_str(&errors[0]).unwrap();
    assert!(record.url.ends_with("/gone"));
    assert_eq!(record.kind, "404");
    assert_eq!(record.retry_count, 0);
}

#[tokio::test]
async fn test_server_error_retried_until_budget_exhausted() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &page("Home", &["/flaky"])).await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.politeness.max_retries = 2;

    assert_eq!(run_crawl(config).await, CrawlOutcome::Complete);

    let errors = read_lines(&dir.path().join("errors.jsonl"));
    assert_eq!(errors.len(), 1);
    let record: ErrorRecord = serde_json::from_str(&errors[0]).unwrap();
    assert_eq!(record.kind, "500");
    assert_eq!(record.retry_count, 2);
}

#[tokio::test]
async fn test_retry_after_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", &page("Home", &[])).await;

    let dir = TempDir::new().unwrap();
    let started = Instant::now();
    let outcome = run_crawl(create_test_config(&server, dir.path())).await;

    assert_eq!(outcome, CrawlOutcome::Complete);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(mapping(dir.path()).len(), 1);
    assert!(read_lines(&dir.path().join("errors.jsonl")).is_empty());
}

#[tokio::test]
async fn test_non_html_skipped_without_error() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &page("Home", &["/feed"])).await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{\"items\": []}", "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    assert_eq!(
        run_crawl(create_test_config(&server, dir.path())).await,
        CrawlOutcome::Complete
    );

    assert_eq!(read_lines(&dir.path().join("seen.txt")).len(), 2);
    assert_eq!(mapping(dir.path()).len(), 1);
    assert!(read_lines(&dir.path().join("errors.jsonl")).is_empty());
}

#[tokio::test]
async fn test_rate_limit_spaces_requests() {
    let server = MockServer::start().await;
    mount_page(&server, "/", &page("Home", &["/a", "/b"])).await;
    mount_page(&server, "/a", &page("Page A", &[])).await;
    mount_page(&server, "/b", &page("Page B", &[])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawler.respect_robots = false;
    config.politeness.rate_limit_seconds = 0.2;

    let started = Instant::now();
    assert_eq!(run_crawl(config).await, CrawlOutcome::Complete);

    // Three requests: at least two full delays between them
    assert!(started.elapsed() >= Duration::from_millis(400));
}
