//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and tempfile for the
//! destination folder, and drive full crawls end-to-end.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_harvest::config::Config;
use sumi_harvest::crawler::{build_http_client, crawl, Dispatcher, Ledger};
use sumi_harvest::storage::{text_file_name, AssetSink};
use sumi_harvest::HarvestError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with the given bounds
fn create_test_config(max_depth: u32, max_concurrent_fetches: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.max_concurrent_fetches = max_concurrent_fetches;
    config.crawler.request_timeout_secs = 5;
    config
}

fn create_dispatcher(config: &Config, root: &Path, ledger: Arc<Ledger>) -> Dispatcher {
    let client = build_http_client(&config.crawler).expect("Failed to build client");
    let sink = AssetSink::create(root.to_path_buf()).expect("Failed to create sink");
    Dispatcher::with_ledger(config, client, sink, ledger)
}

/// Mounts an HTML page that must be fetched exactly `times` times
async fn mount_page(server: &MockServer, route: &str, html: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .expect(times)
        .mount(server)
        .await;
}

fn text_files(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(root.join("text"))
        .expect("text folder missing")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_single_page_linking_to_visited_address() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let seed = format!("{}/", base_url);

    mount_page(
        &mock_server,
        "/",
        r#"<html><body><p>Only page</p><a href="/visited">Seen before</a></body></html>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/visited", "<p>never</p>", 0).await;

    let ledger = Arc::new(Ledger::new());
    assert!(ledger.claim(&format!("{}/visited", base_url)));

    let root = TempDir::new().unwrap();
    let config = create_test_config(1, 10);
    let dispatcher = create_dispatcher(&config, root.path(), ledger);

    let report = dispatcher.run(&seed).await;

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.children_spawned, 0);
    assert_eq!(report.fetch_failures, 0);
    assert_eq!(dispatcher.outstanding(), 0);
    assert_eq!(text_files(root.path()).len(), 1);
}

#[tokio::test]
async fn test_claimed_link_not_refetched_below_depth_bound() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body><a href="/visited">Seen</a><a href="/fresh">New</a></body></html>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/visited", "<p>never</p>", 0).await;
    mount_page(&mock_server, "/fresh", "<p>fresh</p>", 1).await;

    let ledger = Arc::new(Ledger::new());
    assert!(ledger.claim(&format!("{}/visited", base_url)));

    let root = TempDir::new().unwrap();
    let config = create_test_config(5, 10);
    let dispatcher = create_dispatcher(&config, root.path(), ledger);

    let report = dispatcher.run(&format!("{}/", base_url)).await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.children_spawned, 1);
    assert_eq!(dispatcher.outstanding(), 0);
}

#[tokio::test]
async fn test_recursive_crawl_saves_text_and_images() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let seed = format!("{}/", base_url);

    mount_page(
        &mock_server,
        "/",
        r#"<html><head><title>Home</title></head><body>
            <h1>Home</h1>
            <p>Welcome   home</p>
            <img src="/logo.png">
            <img src="/icon.svg">
            <a href="/a">Page A</a>
            <a href="/b">Page B</a>
        </body></html>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/a",
        r#"<html><body><p>Content A</p><a href="/">Home</a><a href="/b">B</a></body></html>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/b",
        r#"<html><body><p>Content B</p><img src="/logo.png"></body></html>"#,
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0x89u8, 0x50, 0x4e, 0x47], "image/png"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/icon.svg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<svg/>", "image/svg+xml"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let config = create_test_config(3, 4);
    let dispatcher = create_dispatcher(&config, root.path(), Arc::new(Ledger::new()));

    let report = dispatcher.run(&seed).await;

    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.fetch_failures, 0);
    assert_eq!(report.images_skipped, 1);
    assert!(report.images_saved >= 2, "logo saved once per page that embeds it");
    assert_eq!(report.text_written, 3);
    assert_eq!(report.addresses_claimed, 3);
    assert_eq!(dispatcher.outstanding(), 0);

    // One text artifact per page, no collisions at the same depth
    assert_eq!(text_files(root.path()).len(), 3);
    let home_text =
        std::fs::read_to_string(root.path().join("text").join(text_file_name(0, &seed)))
            .expect("home text missing");
    assert!(home_text.starts_with("Home\nWelcome home"));
    assert!(home_text.contains("Page A"));

    let logo = std::fs::read(root.path().join("img").join("logo.png")).expect("logo missing");
    assert_eq!(logo, vec![0x89, 0x50, 0x4e, 0x47]);
    assert!(!root.path().join("img").join("icon.svg").exists());
}

#[tokio::test]
async fn test_failed_branch_does_not_stop_siblings() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body>
            <a href="/missing">Missing</a>
            <a href="/broken">Broken</a>
            <a href="/ok">Ok</a>
        </body></html>"#,
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/ok",
        r#"<html><body><p>fine</p><a href="/deeper">Deeper</a></body></html>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/deeper", "<p>deeper</p>", 1).await;

    let root = TempDir::new().unwrap();
    let config = create_test_config(5, 2);
    let dispatcher = create_dispatcher(&config, root.path(), Arc::new(Ledger::new()));

    let report = dispatcher.run(&format!("{}/", base_url)).await;

    assert_eq!(report.fetch_failures, 2);
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(text_files(root.path()).len(), 3);
}

#[tokio::test]
async fn test_depth_bound_limits_recursion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/0", r#"<a href="/1">next</a>"#, 1).await;
    mount_page(&mock_server, "/1", r#"<a href="/2">next</a>"#, 1).await;
    mount_page(&mock_server, "/2", r#"<a href="/3">next</a>"#, 0).await;

    let root = TempDir::new().unwrap();
    let config = create_test_config(2, 10);
    let dispatcher = create_dispatcher(&config, root.path(), Arc::new(Ledger::new()));

    let report = dispatcher.run(&format!("{}/0", base_url)).await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.children_spawned, 1);
    assert_eq!(report.links_skipped, 1);
    // Children at the bound are never created, so nothing is pruned at claim time
    assert_eq!(report.depth_pruned, 0);
    assert_eq!(report.tasks_finished(), 2);
}

#[tokio::test]
async fn test_non_html_response_is_parse_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", r#"<a href="/data.json">data</a>"#, 1).await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"a":1}"#, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let config = create_test_config(3, 10);
    let dispatcher = create_dispatcher(&config, root.path(), Arc::new(Ledger::new()));

    let report = dispatcher.run(&format!("{}/", base_url)).await;

    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.parse_failures, 1);
    assert_eq!(text_files(root.path()).len(), 1);
}

#[tokio::test]
async fn test_admission_gate_serializes_fetches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let delay = Duration::from_millis(200);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"<a href="/a">a</a><a href="/b">b</a><a href="/c">c</a>"#, "text/html")
                .set_delay(delay),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    for route in ["/a", "/b", "/c"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<p>leaf</p>", "text/html")
                    .set_delay(delay),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let root = TempDir::new().unwrap();
    let config = create_test_config(3, 1);
    let dispatcher = create_dispatcher(&config, root.path(), Arc::new(Ledger::new()));

    let started = Instant::now();
    let report = dispatcher.run(&format!("{}/", base_url)).await;
    let elapsed = started.elapsed();

    assert_eq!(report.pages_fetched, 4);
    // One slot: the three leaves cannot overlap each other or the seed
    assert!(
        elapsed >= delay * 4,
        "fetches overlapped: finished in {:?}",
        elapsed
    );
    assert_eq!(dispatcher.available_slots(), 1);
}

#[tokio::test]
async fn test_crawl_creates_domain_folder() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "<h2>Hello</h2>", 1).await;

    let base = TempDir::new().unwrap();
    let mut config = create_test_config(2, 10);
    config.output.base_dir = base.path().to_string_lossy().into_owned();

    let report = crawl(config, &format!("{}/", base_url))
        .await
        .expect("Crawl failed");

    assert_eq!(report.pages_fetched, 1);
    let destination = base.path().join("127_0_0_1");
    assert!(destination.join("img").is_dir());
    assert_eq!(text_files(&destination).len(), 1);
}

#[tokio::test]
async fn test_uncreatable_destination_aborts_before_crawling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "<p>unreached</p>", 0).await;

    let base = TempDir::new().unwrap();
    let blocker = base.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let mut config = create_test_config(2, 10);
    config.output.base_dir = blocker.to_string_lossy().into_owned();

    let result = crawl(config, &format!("{}/", base_url)).await;
    assert!(matches!(result, Err(HarvestError::Storage(_))));
}

#[tokio::test]
async fn test_persistence_failures_do_not_stop_children() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body><p>parent</p><img src="/gone.png"><a href="/child">Child</a></body></html>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/child", "<p>child</p>", 1).await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = TempDir::new().unwrap();
    let config = create_test_config(3, 10);
    let dispatcher = create_dispatcher(&config, root.path(), Arc::new(Ledger::new()));
    std::fs::remove_dir_all(root.path().join("text")).unwrap();

    let report = dispatcher.run(&format!("{}/", base_url)).await;

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.children_spawned, 1);
    assert_eq!(report.image_failures, 1);
    assert_eq!(report.images_saved, 0);
    assert_eq!(report.write_failures, 2);
    assert_eq!(report.text_written, 0);
    assert_eq!(dispatcher.outstanding(), 0);
}

#[tokio::test]
async fn test_redirected_page_links_resolve_against_final_address() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new/"))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/new/", r#"<a href="child">child</a>"#, 1).await;
    mount_page(&mock_server, "/new/child", "<p>found</p>", 1).await;
    mount_page(&mock_server, "/child", "<p>wrong base</p>", 0).await;

    let root = TempDir::new().unwrap();
    let config = create_test_config(3, 10);
    let dispatcher = create_dispatcher(&config, root.path(), Arc::new(Ledger::new()));

    let report = dispatcher.run(&format!("{}/old", base_url)).await;

    assert_eq!(report.pages_fetched, 2);
    assert!(dispatcher.ledger().contains(&format!("{}/new/child", base_url)));
}

#[tokio::test]
async fn test_zero_capacity_config_rejected_before_crawling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "<p>unreached</p>", 0).await;

    let base = TempDir::new().unwrap();
    let mut config = create_test_config(2, 0);
    config.output.base_dir = base.path().to_string_lossy().into_owned();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        crawl(config, &format!("{}/", base_url)),
    )
    .await
    .expect("crawl must not wait on a closed gate");

    assert!(matches!(result, Err(HarvestError::Config(_))));
    assert!(!base.path().join("127_0_0_1").exists());
}

#[tokio::test]
async fn test_unfetchable_seed_rejected() {
    let base = TempDir::new().unwrap();
    let mut config = create_test_config(2, 10);
    config.output.base_dir = base.path().to_string_lossy().into_owned();

    for seed in ["mailto:someone@example.com", "example.com", "ftp://example.com/"] {
        let result = crawl(config.clone(), seed).await;
        assert!(
            matches!(result, Err(HarvestError::UrlError(_))),
            "{} should be rejected",
            seed
        );
    }
    assert_eq!(std::fs::read_dir(base.path()).unwrap().count(), 0);
}
