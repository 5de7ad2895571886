//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end through the HTTP fetcher.

use site_indexer::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use site_indexer::crawler::{run_crawl, Coordinator, HttpFetcher};
use site_indexer::output::{CrawlReport, TermMatrix};
use site_indexer::state::PageState;
use site_indexer::storage::{RunStatus, SqliteStorage, Storage};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `seed` into `db_path`
fn create_test_config(seed: &str, db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_url: seed.to_string(),
            max_to_index: None,
            max_concurrent_fetches: 1,
            request_timeout_secs: 5,
            stopwords_path: None,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            term_matrix_path: db_path
                .with_extension("csv")
                .to_string_lossy()
                .into_owned(),
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A small site with a robots exclusion, a redirect, a 404 and mirrored content
async fn mount_site(server: &MockServer) {
    mount_get(
        server,
        "/robots.txt",
        ResponseTemplate::new(200)
            .set_body_string("User-agent: *\nDisallow: /private\n")
            .insert_header("content-type", "text/plain"),
    )
    .await;

    mount_get(
        server,
        "/",
        html(
            r#"<html><head><title>Home</title></head><body>
            <a href="/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/missing">Missing</a>
            <a href="/old">Moved</a>
            <a href="/private/secret">Secret</a>
            <a href="https://elsewhere.example/">Elsewhere</a>
            <img src="/logo.png">
            </body></html>"#,
        ),
    )
    .await;

    mount_get(server, "/page1", html("<html><body><p>Mirrored content</p></body></html>")).await;
    mount_get(server, "/page2", html("<html><body><p>Mirrored content</p></body></html>")).await;
    mount_get(server, "/page3", html("<html><body><p>Moved here</p></body></html>")).await;
    mount_get(
        server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/page3"),
    )
    .await;
    mount_get(server, "/missing", ResponseTemplate::new(404)).await;
    mount_get(
        server,
        "/logo.png",
        ResponseTemplate::new(200)
            .set_body_bytes(vec![0x89, b'P', b'N', b'G'])
            .insert_header("content-type", "image/png"),
    )
    .await;
    mount_get(server, "/private/secret", html("<p>should never be fetched</p>")).await;
}

fn coordinator(config: Config, storage: SqliteStorage) -> Coordinator<HttpFetcher> {
    let fetcher = HttpFetcher::new(&config.user_agent, Duration::from_secs(5))
        .expect("Failed to build fetcher");
    Coordinator::new(config, storage, fetcher).expect("Failed to create coordinator")
}

async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&format!("{}/", server.uri()), &dir.path().join("site.db"));
    let mut coordinator = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let outcome = coordinator.run().await.expect("Crawl failed");

    // home, page1, page2, missing, old, logo.png
    assert_eq!(outcome.pages_indexed, 6);
    // home, mirrored content once, the redirect target
    assert_eq!(outcome.documents_indexed, 3);
    assert_eq!(outcome.frontier_remaining, 0);

    let storage = coordinator.storage();
    let pages = storage.all_pages().unwrap();
    let paths: Vec<String> = pages
        .iter()
        .map(|p| p.url.to_url().unwrap().path().to_string())
        .collect();
    assert_eq!(
        paths,
        vec!["/", "/page1", "/page2", "/missing", "/old", "/logo.png"]
    );

    let missing = &pages[3];
    assert_eq!(missing.state, PageState::DeadLink);
    assert_eq!(missing.status_code, Some(404));

    let moved = &pages[4];
    assert_eq!(moved.state, PageState::Processed);
    assert_eq!(moved.redirect_history, vec![format!("{}/old", server.uri())]);

    assert_eq!(pages[1].content_hash, pages[2].content_hash);

    let fetched = requested_paths(&server).await;
    assert!(!fetched.iter().any(|p| p.starts_with("/private")));
    assert_eq!(fetched.iter().filter(|p| *p == "/page1").count(), 1);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.forbidden_prefixes, vec![format!("{}/private", server.uri())]);
}

#[tokio::test]
async fn test_crawl_respects_max_to_index() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), &dir.path().join("site.db"));
    config.crawler.max_to_index = Some(2);
    let mut coordinator = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let outcome = coordinator.run().await.unwrap();

    assert_eq!(outcome.total_pages, 2);
    assert!(outcome.frontier_remaining > 0);
    let page_fetches = requested_paths(&server)
        .await
        .into_iter()
        .filter(|p| p != "/robots.txt")
        .count();
    assert_eq!(page_fetches, 2);
}

#[tokio::test]
async fn test_interrupted_crawl_resumes_from_database() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("site.db");

    let mut first = create_test_config(&server.uri(), &db_path);
    first.crawler.max_to_index = Some(3);
    let mut coordinator = coordinator(first, SqliteStorage::new(&db_path).unwrap());
    coordinator.run().await.unwrap();
    drop(coordinator);

    let config = create_test_config(&server.uri(), &db_path);
    let mut resumed = self::coordinator(config, SqliteStorage::new(&db_path).unwrap());
    let outcome = resumed.run().await.unwrap();

    assert_eq!(outcome.pages_indexed, 3);
    assert_eq!(outcome.total_pages, 6);

    let ids: Vec<u64> = resumed
        .storage()
        .all_pages()
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);

    // each page was fetched exactly once across both runs
    let fetched = requested_paths(&server).await;
    for route in ["/", "/page1", "/page2", "/missing", "/logo.png"] {
        assert_eq!(fetched.iter().filter(|p| *p == route).count(), 1, "{}", route);
    }
}

#[tokio::test]
async fn test_concurrent_crawl_matches_sequential() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let sequential_config = create_test_config(&server.uri(), &dir.path().join("a.db"));
    let mut parallel_config = sequential_config.clone();
    parallel_config.crawler.max_concurrent_fetches = 4;

    let mut sequential = coordinator(sequential_config, SqliteStorage::new_in_memory().unwrap());
    sequential.run().await.unwrap();
    let mut parallel = coordinator(parallel_config, SqliteStorage::new_in_memory().unwrap());
    parallel.run().await.unwrap();

    assert_eq!(
        sequential.index().urls.indexed_urls(),
        parallel.index().urls.indexed_urls()
    );
    assert_eq!(
        sequential.storage().all_documents().unwrap(),
        parallel.storage().all_documents().unwrap()
    );
}

#[tokio::test]
async fn test_unreachable_seed_still_completes() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("site.db");
    let mut config = create_test_config("http://127.0.0.1:9/", &db_path);
    config.crawler.request_timeout_secs = 2;

    let outcome = run_crawl(config).await.expect("Crawl should not fail");
    assert_eq!(outcome.pages_indexed, 1);
    assert_eq!(outcome.documents_indexed, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let page = storage.get_page(0).unwrap().unwrap();
    assert_eq!(page.state, PageState::Unreachable);
    assert_eq!(
        storage.get_latest_run().unwrap().unwrap().status,
        RunStatus::Completed
    );
}

#[tokio::test]
async fn test_report_and_term_matrix_after_crawl() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("site.db");
    let config = create_test_config(&server.uri(), &db_path);
    let matrix_path = config.output.term_matrix_path.clone();

    run_crawl(config).await.unwrap();

    let storage = SqliteStorage::new(&db_path).unwrap();
    let report = CrawlReport::from_storage(&storage).unwrap();
    assert_eq!(report.total_pages(), 6);
    assert_eq!(report.broken.len(), 1);
    assert_eq!(report.duplicate_content.len(), 1);
    assert_eq!(report.duplicate_content[0].urls.len(), 2);
    assert_eq!(report.images.len(), 1);
    assert!(report
        .out_of_bounds
        .iter()
        .any(|u| u.as_str().starts_with("https://elsewhere.example")));

    let matrix = TermMatrix::from_storage(&storage).unwrap();
    matrix.save(Path::new(&matrix_path)).unwrap();
    let csv = std::fs::read_to_string(&matrix_path).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("document_id,"));
    assert!(header.split(',').any(|term| term == "mirrored"));
    assert_eq!(csv.lines().count(), 4);
}

#[tokio::test]
async fn test_directory_seed_with_directory_disallow() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200)
            .set_body_string("User-agent: *\nDisallow: /docs/tmp/\n")
            .insert_header("content-type", "text/plain"),
    )
    .await;
    mount_get(
        &server,
        "/docs/",
        html(
            r#"<html><body>
            <a href="guide">Guide</a>
            <a href="tmp/scratch">Scratch</a>
            <a href="tmpl.html">Templates</a>
            </body></html>"#,
        ),
    )
    .await;
    mount_get(&server, "/docs/guide", html("<p>Read the guide</p>")).await;
    mount_get(&server, "/docs/tmpl.html", html("<p>Template list</p>")).await;
    mount_get(&server, "/docs/tmp/scratch", html("<p>should never be fetched</p>")).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&format!("{}/docs/", server.uri()), &dir.path().join("site.db"));
    let mut coordinator = coordinator(config, SqliteStorage::new_in_memory().unwrap());

    let outcome = coordinator.run().await.expect("Crawl failed");
    assert_eq!(outcome.pages_indexed, 3);

    let storage = coordinator.storage();
    let paths: Vec<String> = storage
        .all_pages()
        .unwrap()
        .iter()
        .map(|p| p.url.to_url().unwrap().path().to_string())
        .collect();
    assert_eq!(paths, vec!["/docs/", "/docs/guide", "/docs/tmpl.html"]);
    assert!(!requested_paths(&server)
        .await
        .iter()
        .any(|p| p.starts_with("/docs/tmp/")));

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.bound_url, format!("{}/docs/", server.uri()));
    assert_eq!(run.forbidden_prefixes, vec![format!("{}/docs/tmp/", server.uri())]);
}
