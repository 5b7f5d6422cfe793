//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end through the HTTP capture adapter.

use sitesnap::capture::{ArtifactStore, HttpCapture};
use sitesnap::config::{CaptureConfig, Config, CrawlerConfig, OutputConfig};
use sitesnap::crawler::crawl;
use sitesnap::state::PageState;
use sitesnap::storage::{open_checkpoint, RunStatus};
use sitesnap::{artifact_name, normalize_url};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration scoped to the mock server
fn create_test_config(base_url: &str, out: &Path, checkpoint: &str) -> Config {
    let mut crawler = CrawlerConfig::for_origin(format!("{}/", base_url));
    crawler.retry_backoff = 10; // Very short for testing

    Config {
        crawler,
        capture: CaptureConfig {
            page_timeout: 5000,
            ..CaptureConfig::default()
        },
        output: OutputConfig {
            output_root: out.to_path_buf(),
            checkpoint_path: out.join(checkpoint),
            report: false,
        },
    }
}

/// An HTML page linking to `links`
fn html_page(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", anchors),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, route: &str, links: &[&str], expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html_page(links))
        .expect(expected)
        .mount(server)
        .await;
}

async fn run_crawl(config: &Config) -> sitesnap::CrawlStats {
    let artifacts = ArtifactStore::new(&config.output.output_root);
    artifacts.init(false).await.expect("Failed to prepare output");
    let capture = HttpCapture::new(&config.capture, artifacts).expect("Failed to build client");
    crawl(config, &capture).await.expect("Crawl failed")
}

fn page_url(base_url: &str, route: &str) -> String {
    normalize_url(&format!("{}{}", base_url, route))
        .expect("Failed to normalize")
        .to_string()
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        &["/page1", "/page2", "https://other.example/", "mailto:me@example.com"],
        1,
    )
    .await;
    mount_page(&mock_server, "/page1", &["/", "/page2", "/page1#top"], 1).await;
    mount_page(&mock_server, "/page2", &["page1?utm_source=nav"], 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), "checkpoint.json");

    let stats = run_crawl(&config).await;

    assert_eq!(stats.captured, 3);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.attempts, 3);

    // Every captured page has its markup on disk
    for route in ["/", "/page1", "/page2"] {
        let url = normalize_url(&format!("{}{}", base_url, route)).unwrap();
        let html = dir
            .path()
            .join("html")
            .join(format!("{}.html", artifact_name(&url)));
        assert!(html.exists(), "Missing markup for {}", route);
    }

    // The checkpoint holds exactly the visited pages
    let mut checkpoint = open_checkpoint(&config.output.checkpoint_path).unwrap();
    let visited = checkpoint.load();
    assert_eq!(visited.len(), 3);
    assert_eq!(visited.count(PageState::Captured), 3);
    let root = visited.get(&page_url(&base_url, "/")).unwrap();
    // Out of scope links are not stored
    assert_eq!(
        root.links,
        Some(vec![page_url(&base_url, "/page1"), page_url(&base_url, "/page2")])
    );

    mock_server.verify().await;
}

#[tokio::test]
async fn test_failing_page_is_skipped_after_retries() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &["/ok", "/broken"], 1).await;
    mount_page(&mock_server, "/ok", &[], 1).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), "checkpoint.json");

    let stats = run_crawl(&config).await;

    assert_eq!(stats.captured, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.attempts, 5);

    let visited = open_checkpoint(&config.output.checkpoint_path)
        .unwrap()
        .load();
    assert_eq!(visited.len(), 3);
    assert_eq!(
        visited.get(&page_url(&base_url, "/broken")).map(|p| p.state),
        Some(PageState::Skipped)
    );

    mock_server.verify().await;
}

#[tokio::test]
async fn test_slow_page_times_out_and_is_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &["/slow"], 1).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html_page(&[]).set_delay(Duration::from_millis(1500)))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path(), "checkpoint.json");
    config.capture.page_timeout = 1000;

    let stats = run_crawl(&config).await;

    assert_eq!(stats.captured, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.attempts, 4);

    let visited = open_checkpoint(&config.output.checkpoint_path)
        .unwrap()
        .load();
    assert_eq!(
        visited.get(&page_url(&base_url, "/slow")).map(|p| p.state),
        Some(PageState::Skipped)
    );

    mock_server.verify().await;
}

#[tokio::test]
async fn test_not_found_skipped_immediately_when_classifying() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &["/missing", "/report.pdf"], 1).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&base_url, dir.path(), "checkpoint.json");
    config.crawler.retry_all_errors = false;

    let stats = run_crawl(&config).await;

    assert_eq!(stats.captured, 1);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.attempts, 3);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_resume_does_not_recapture() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &["/a"], 1).await;
    mount_page(&mock_server, "/a", &["/b"], 1).await;
    mount_page(&mock_server, "/b", &[], 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), "checkpoint.json");

    let first = run_crawl(&config).await;
    assert_eq!(first.captured, 3);

    // Same checkpoint: everything is walked through, nothing fetched again
    let second = run_crawl(&config).await;
    assert_eq!(second.captured, 0);
    assert_eq!(second.resumed, 3);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_resume_continues_interrupted_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &["/a", "/c"], 0).await;
    mount_page(&mock_server, "/a", &[], 0).await;
    mount_page(&mock_server, "/c", &["/a"], 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), "checkpoint.json");

    // A checkpoint left behind by a run that stopped after capturing / and /a
    let mut visited = sitesnap::VisitedSet::new();
    visited.set_outcome(
        &page_url(&base_url, "/"),
        PageState::Captured,
        vec![page_url(&base_url, "/a"), page_url(&base_url, "/c")],
    );
    visited.set_outcome(&page_url(&base_url, "/a"), PageState::Captured, vec![]);
    open_checkpoint(&config.output.checkpoint_path)
        .unwrap()
        .save(&visited)
        .unwrap();

    let stats = run_crawl(&config).await;

    assert_eq!(stats.captured, 1);
    let final_set = open_checkpoint(&config.output.checkpoint_path)
        .unwrap()
        .load();
    assert!(final_set.is_superset_of(&visited));
    assert_eq!(final_set.len(), 3);

    mock_server.verify().await;
}

#[tokio::test]
async fn test_url_list_checkpoint_recaptures_to_find_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &["/a", "/c"], 1).await;
    mount_page(&mock_server, "/a", &[], 1).await;
    mount_page(&mock_server, "/c", &[], 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), "checkpoint.json");

    // Older checkpoints stored a bare list of captured URLs
    std::fs::write(
        &config.output.checkpoint_path,
        format!(r#"["{}/", "{}/a"]"#, base_url, base_url),
    )
    .unwrap();

    let stats = run_crawl(&config).await;

    assert_eq!(stats.recaptured, 2);
    assert_eq!(stats.captured, 1);
    assert_eq!(stats.skipped, 0);

    let visited = open_checkpoint(&config.output.checkpoint_path)
        .unwrap()
        .load();
    assert_eq!(visited.len(), 3);
    assert_eq!(visited.count(PageState::Captured), 3);
    assert_eq!(
        visited.get(&page_url(&base_url, "/")).and_then(|p| p.links.clone()),
        Some(vec![page_url(&base_url, "/a"), page_url(&base_url, "/c")])
    );

    mock_server.verify().await;
}

#[tokio::test]
async fn test_corrupt_checkpoint_starts_fresh() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &[], 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), "checkpoint.json");
    std::fs::write(&config.output.checkpoint_path, "{\"version\": 1, \"pages\": [").unwrap();

    let stats = run_crawl(&config).await;
    assert_eq!(stats.captured, 1);

    let preserved = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().starts_with("checkpoint.json.corrupt-"));
    assert!(preserved, "Corrupt checkpoint should be kept aside");

    mock_server.verify().await;
}

#[tokio::test]
async fn test_sqlite_checkpoint_records_runs() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", &["/a"], 1).await;
    mount_page(&mock_server, "/a", &[], 1).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(&base_url, dir.path(), "checkpoint.db");

    run_crawl(&config).await;
    run_crawl(&config).await;

    let mut checkpoint = open_checkpoint(&config.output.checkpoint_path).unwrap();
    assert_eq!(checkpoint.load().count(PageState::Captured), 2);

    let runs = checkpoint.runs().unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.status == RunStatus::Completed));
    // Most recent first: the resumed run captured nothing
    assert_eq!(runs[0].pages_captured, 0);
    assert_eq!(runs[1].pages_captured, 2);

    mock_server.verify().await;
}
