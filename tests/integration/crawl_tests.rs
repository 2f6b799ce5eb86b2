//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run full crawls
//! through the real reqwest transport.

use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use webcrawler::config::load_config;
use webcrawler::output::{load_results, save_results};
use webcrawler::{CrawlConfig, CrawlState, Crawler};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast test configuration seeded at the mock server root
///
/// robots.txt is always fetched over https, which the mock server does not
/// speak, so robots handling is switched off here and covered by unit tests.
fn create_test_config(base_url: &str) -> CrawlConfig {
    let mut config = CrawlConfig::new(format!("{}/", base_url));
    config.crawler.delay = 0.0;
    config.crawler.respect_robots_txt = false;
    config.crawler.seed = Some(1);
    config.request.timeout = 5.0;
    config.request.max_retries = 0;
    config
}

fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ))
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html_page(
            "Home",
            &format!(
                r#"<meta name="description" content="Landing page">
                <a href="{}/page1">Page 1</a>
                <a href="/page2">Page 2</a>
                <a href="https://elsewhere.example/">Offsite</a>"#,
                base_url
            ),
        ),
    )
    .await;
    mount_page(&mock_server, "/page1", html_page("Page 1", "Content 1")).await;
    mount_page(&mock_server, "/page2", html_page("Page 2", r#"<a href="/">Home</a>"#)).await;

    let mut crawler = Crawler::new(create_test_config(&base_url)).expect("Failed to create crawler");
    let results = crawler.crawl().await.expect("Crawl failed");

    let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
        ]
    );

    let home = &results[0];
    assert_eq!(home.title, "Home");
    assert_eq!(home.meta_description, "Landing page");
    assert_eq!(home.links.len(), 2);
    assert_eq!(home.status_code, Some(200));
    assert_eq!(home.depth, 0);
    assert!(home.response_time.is_some());
    assert_eq!(results[1].title, "Page 1");
    assert_eq!(results[2].depth, 1);

    assert_eq!(crawler.state(), CrawlState::Done);
    let summary = crawler.summary();
    assert_eq!(summary.successful_pages, 3);
    assert_eq!(summary.max_depth_reached, 1);
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", html_page("Level 0", r#"<a href="/level1">next</a>"#)).await;
    mount_page(&mock_server, "/level1", html_page("Level 1", r#"<a href="/level2">next</a>"#)).await;
    mount_page(&mock_server, "/level2", html_page("Level 2", r#"<a href="/level3">next</a>"#)).await;
    mount_page(&mock_server, "/level3", html_page("Level 3", "end")).await;

    let mut config = create_test_config(&base_url);
    config.crawler.max_depth = 2;
    let mut crawler = Crawler::new(config).unwrap();
    let results = crawler.crawl().await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.depth <= 2));
    assert!(results.iter().all(|r| !r.url.ends_with("/level3")));
}

#[tokio::test]
async fn test_page_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let links: String = (0..10).map(|i| format!(r#"<a href="/p{}">p</a>"#, i)).collect();
    mount_page(&mock_server, "/", html_page("Hub", &links)).await;
    Mock::given(method("GET"))
        .respond_with(html_page("Leaf", "leaf"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.max_pages = 4;
    let mut crawler = Crawler::new(config).unwrap();
    let results = crawler.crawl().await.unwrap();
    assert_eq!(results.len(), 4);
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html_page("Home", r#"<a href="/feed">feed</a><a href="/gone">gone</a>"#),
    )
    .await;
    mount_page(
        &mock_server,
        "/feed",
        ResponseTemplate::new(200)
            .set_body_string("plain text")
            .insert_header("content-type", "Text/Plain"),
    )
    .await;
    mount_page(&mock_server, "/gone", ResponseTemplate::new(404)).await;

    let mut crawler = Crawler::new(create_test_config(&base_url)).unwrap();
    let results = crawler.crawl().await.unwrap();
    assert_eq!(results.len(), 3);

    let feed = &results[1];
    assert_eq!(feed.error.as_deref(), Some("non-HTML content: text/plain"));
    assert_eq!(feed.content_type.as_deref(), Some("Text/Plain"));
    assert_eq!(feed.content_length, Some(10));

    let gone = &results[2];
    assert_eq!(gone.error.as_deref(), Some("HTTP 404"));
    assert_eq!(gone.status_code, Some(404));

    assert_eq!(crawler.failed_pages().len(), 2);
}

#[tokio::test]
async fn test_configured_user_agent_is_sent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(html_page("Matched", "ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.user_agent = "TestBot/1.0".to_string();
    let mut crawler = Crawler::new(config).unwrap();
    let results = crawler.crawl().await.unwrap();

    assert_eq!(results[0].title, "Matched");
    assert_eq!(results[0].user_agent_used, "TestBot/1.0");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", html_page("Recovered", "ok")).await;

    let mut config = create_test_config(&base_url);
    config.request.max_retries = 3;
    let mut crawler = Crawler::new(config).unwrap();
    let results = crawler.crawl().await.unwrap();

    assert!(results[0].is_success());
    assert_eq!(results[0].title, "Recovered");
    assert_eq!(results[0].retry_count, 2);
}

#[tokio::test]
async fn test_rate_limit_raises_delay() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", ResponseTemplate::new(429)).await;

    let mut config = create_test_config(&base_url);
    config.crawler.delay = 0.02;
    let mut crawler = Crawler::new(config).unwrap();
    let results = crawler.crawl().await.unwrap();

    assert_eq!(results[0].error.as_deref(), Some("HTTP 429"));
    assert!((crawler.base_delay() - 0.03).abs() < 1e-9);
}

#[tokio::test]
async fn test_unreachable_seed() {
    // Bind and drop a server to get a port nothing listens on
    let base_url = {
        let server = MockServer::start().await;
        server.uri()
    };

    let mut crawler = Crawler::new(create_test_config(&base_url)).unwrap();
    let results = crawler.crawl().await.unwrap();

    assert_eq!(results.len(), 1);
    let error = results[0].error.as_deref().unwrap();
    assert!(
        error.starts_with("connection error: ") || error.starts_with("request error: "),
        "unexpected error: {}",
        error
    );
    assert!(results[0].status_code.is_none());
}

#[tokio::test]
async fn test_results_saved_as_json() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", html_page("Home", r#"<a href="/a">a</a>"#)).await;
    mount_page(&mock_server, "/a", html_page("A", "")).await;

    let mut crawler = Crawler::new(create_test_config(&base_url)).unwrap();
    let results = crawler.crawl().await.unwrap();

    let dir = TempDir::new().unwrap();
    let out = dir.path().join("crawl_results.json");
    save_results(&out, &results).unwrap();

    let loaded = load_results(&out).unwrap();
    assert_eq!(loaded.len(), results.len());
    for (saved, original) in loaded.iter().zip(&results) {
        assert_eq!(saved.url, original.url);
        assert_eq!(saved.title, original.title);
        assert_eq!(saved.links, original.links);
        assert_eq!(saved.status_code, original.status_code);
        assert_eq!(saved.timestamp, original.timestamp);
        let (a, b) = (saved.response_time.unwrap(), original.response_time.unwrap());
        assert!((a.as_secs_f64() - b.as_secs_f64()).abs() < 1e-6);
    }
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", html_page("Home", r#"<a href="/about">about</a>"#)).await;
    mount_page(&mock_server, "/about", html_page("About", "")).await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[crawler]
seed-url = "{}/"
max-depth = 1
max-pages = 10
delay = 0.0
respect-robots-txt = false

[anti-detection]
user-agent-rotation = true
random-user-agent-rotation = false
custom-user-agents = ["AgentOne/1.0", "AgentTwo/1.0"]
session-rotation-interval = 1

[request]
timeout = 5.0
max-retries = 0
"#,
        base_url
    )
    .unwrap();

    let config = load_config(file.path()).unwrap();
    let mut crawler = Crawler::new(config).unwrap();
    let results = crawler.crawl().await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].user_agent_used, "AgentOne/1.0");
    assert_eq!(results[1].user_agent_used, "AgentTwo/1.0");

    let stats = crawler.anti_detection_stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.session_rotations, 1);
    assert_eq!(stats.user_agents.unwrap().rotation_mode, "cyclic");
}

#[tokio::test]
async fn test_fails_over_from_proxy_that_drops_connections() {
    // Plain HTTP proxies receive absolute-form requests, so the mock server
    // can stand in for a working proxy.
    let working_proxy = MockServer::start().await;
    mount_page(&working_proxy, "/", html_page("Via proxy", "")).await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_proxy = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            drop(stream);
        }
    });

    let mut config = create_test_config("http://site.test");
    config.proxy.enabled = true;
    config.proxy.validate = false;
    config.proxy.proxies = vec![dead_proxy, working_proxy.uri()];
    let mut crawler = Crawler::new(config).unwrap();
    let results = crawler.crawl().await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_success(), "{:?}", results[0].error);
    assert_eq!(results[0].title, "Via proxy");
    assert_eq!(results[0].proxy_used.as_deref(), Some(working_proxy.uri().as_str()));
    assert_eq!(results[0].retry_count, 1);

    let health = crawler.proxy_health().unwrap();
    assert_eq!(health.failed, 1);
    assert_eq!(health.healthy, 1);
}
