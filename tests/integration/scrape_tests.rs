//! Integration tests for the scrape pipeline
//!
//! These tests use wiremock to serve a directory page and country pages and
//! run the full fetch, extract and publish cycle end-to-end.

use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use travel_health_scraper::config::{Config, OutputConfig, ScraperConfig, UserAgentConfig};
use travel_health_scraper::crawler::{
    run_scrape, Coordinator, HttpFetcher, ScrapeOptions, DIRECTORY_ERROR_KEY,
};
use travel_health_scraper::model::{CountryRecord, ErrorLogEntry};
use travel_health_scraper::output::{decompress_record, DataIndex, LastUpdate, RegionPartition};
use travel_health_scraper::state::ScrapeProgress;
use travel_health_scraper::storage::{JsonProgressStore, ProgressStore};
use travel_health_scraper::FetchError;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, output_dir: &Path) -> Config {
    Config {
        scraper: ScraperConfig {
            base_url: base_url.to_string(),
            countries_url: format!("{}/countries", base_url),
            delay_ms: 0, // No pacing in tests
            random_delay_max_ms: 0,
            error_delay_multiplier: 1,
            max_retries: 3,
            retry_backoff_ms: 10,
            rate_limit_fallback_ms: 10,
            timeout_ms: 5000,
            progress_save_interval: 2,
            max_requests: 100,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestScraper".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            output_dir: output_dir.display().to_string(),
            partition_warning_bytes: 800_000,
        },
    }
}

fn directory_page(countries: &[&str]) -> String {
    let links: String = countries
        .iter()
        .enumerate()
        .map(|(i, name)| {
            format!(
                r#"<a href="/country/{}/{}">{}</a>"#,
                i + 1,
                name.to_lowercase(),
                name
            )
        })
        .collect();
    format!(
        r#"<html><body><h1>Countries</h1><div class="number_div">{}</div></body></html>"#,
        links
    )
}

fn country_page(name: &str) -> String {
    format!(
        r#"<html><head><title>{name} - Travel Health</title></head><body>
        <h1>{name}</h1>
        <h2 id="Vaccine_Recommendations">Vaccine Recommendations</h2>
        <h3>Most travellers</h3>
        <div>
          <div class="accordion-item"><button>Hepatitis A</button>
            <div><p>Hepatitis A is recommended for all travellers to {name}.</p></div></div>
          <div class="accordion-item"><button>Tetanus</button>
            <div><p>Ensure tetanus vaccination is up to date.</p></div></div>
        </div>
        <h3>Some travellers</h3>
        <div>
          <div class="accordion-item"><button>Rabies</button>
            <div><p>Consider for travellers with animal contact.</p></div></div>
        </div>
        <h2 id="Other_Risks">Other Risks</h2>
        <div><div class="accordion-item"><button>Insect bites</button>
          <div><p>Avoid mosquito bites day and night.</p></div></div></div>
        </body></html>"#
    )
}

fn country_path(index: usize, name: &str) -> String {
    format!("/country/{}/{}", index, name.to_lowercase())
}

/// Mounts the directory and one page per country
async fn mount_site(server: &MockServer, countries: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_string(directory_page(countries)))
        .mount(server)
        .await;

    for (i, name) in countries.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(country_path(i + 1, name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(country_page(name)))
            .mount(server)
            .await;
    }
}

fn read_json<T: serde::de::DeserializeOwned>(dir: &Path, file: &str) -> T {
    let content = std::fs::read_to_string(dir.join(file))
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", file, e));
    serde_json::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse {}: {}", file, e))
}

#[tokio::test]
async fn test_directory_is_fetched_and_parsed() {
    let server = MockServer::start().await;
    mount_site(&server, &["Brazil", "Kenya"]).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let store = JsonProgressStore::in_dir(output.path());
    let mut coordinator = Coordinator::new(config, store, true).unwrap();

    let countries = coordinator.fetch_directory().await;

    let slugs: Vec<&str> = countries.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, vec!["brazil", "kenya"]);
    assert_eq!(countries[1].url, format!("{}/country/2/kenya", server.uri()));
    assert!(coordinator.error_log().is_empty());
}

#[tokio::test]
async fn test_full_scrape_publishes_partitions() {
    let server = MockServer::start().await;
    mount_site(&server, &["Brazil", "Kenya", "Thailand"]).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let options = ScrapeOptions {
        config_hash: Some("test-hash".to_string()),
        ..ScrapeOptions::default()
    };

    let outcome = run_scrape(config, options).await.expect("Scrape failed");

    assert_eq!(outcome.batch.done, 3);
    assert_eq!(outcome.batch.errored, 0);
    assert!(!outcome.batch.ceiling_reached);
    assert_eq!(outcome.summary.total_countries, 3);
    assert_eq!(outcome.summary.with_data, 3);
    assert_eq!(outcome.summary.most_travellers, 6);

    let index: DataIndex = read_json(output.path(), "chrome-index.json");
    assert_eq!(index.total_countries, 3);
    assert_eq!(index.regions, vec!["Africa", "Americas", "Asia"]);

    let americas: RegionPartition = read_json(output.path(), "chrome-data-americas.json");
    assert_eq!(americas.metadata.country_count, 1);
    let brazil = decompress_record(&americas.countries["Brazil"]);
    assert_eq!(brazil.most_travellers[0].name, "Hepatitis A");
    assert_eq!(brazil.some_travellers[0].name, "Rabies");
    assert_eq!(brazil.other_risks[0].name, "Insect Bites");

    let last: LastUpdate = read_json(output.path(), "last-update.json");
    assert_eq!(last.countries_count, 3);
    assert_eq!(last.config_hash.as_deref(), Some("test-hash"));

    let errors: Vec<ErrorLogEntry> = read_json(output.path(), "error-log.json");
    assert!(errors.is_empty());
}

#[tokio::test]
async fn test_partitions_are_disjoint() {
    let server = MockServer::start().await;
    let countries = ["Brazil", "Chile", "France", "Kenya", "Peru", "Thailand"];
    mount_site(&server, &countries).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    run_scrape(config, ScrapeOptions::default())
        .await
        .expect("Scrape failed");

    let index: DataIndex = read_json(output.path(), "chrome-index.json");
    let mut seen = Vec::new();
    for file in &index.data_files {
        let partition: RegionPartition = read_json(output.path(), file);
        seen.extend(partition.countries.keys().cloned());
    }
    seen.sort();

    assert_eq!(seen, countries.to_vec());
}

#[tokio::test]
async fn test_resume_skips_done_countries() {
    let server = MockServer::start().await;
    let countries = ["Brazil", "Kenya", "Peru"];

    Mock::given(method("GET"))
        .and(path("/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_string(directory_page(&countries)))
        .mount(&server)
        .await;

    // Brazil and Kenya are already done and must not be requested again
    for (i, name) in countries.iter().enumerate().take(2) {
        Mock::given(method("GET"))
            .and(path(country_path(i + 1, name)))
            .respond_with(ResponseTemplate::new(200).set_body_string(country_page(name)))
            .expect(0)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(country_path(3, "Peru")))
        .respond_with(ResponseTemplate::new(200).set_body_string(country_page("Peru")))
        .expect(1)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let mut saved = ScrapeProgress::new();
    for name in ["Brazil", "Kenya"] {
        let record = CountryRecord::empty(format!("{}/saved/{}", server.uri(), name), Utc::now());
        saved.insert_record(name, record, "Other");
    }
    let mut store = JsonProgressStore::in_dir(output.path());
    store.save(&saved).unwrap();

    let config = create_test_config(&server.uri(), output.path());
    let outcome = run_scrape(config, ScrapeOptions::default())
        .await
        .expect("Scrape failed");

    assert_eq!(outcome.batch.skipped, 2);
    assert_eq!(outcome.batch.attempted, 1);
    assert_eq!(outcome.batch.done, 1);
    assert_eq!(outcome.summary.total_countries, 3);

    let progress = store.load().unwrap().expect("Progress not saved");
    assert!(progress.is_done("Peru"));
    assert_eq!(progress.region_of("Peru"), Some("Americas"));
}

#[tokio::test]
async fn test_fresh_run_refetches_everything() {
    let server = MockServer::start().await;
    mount_site(&server, &["Kenya"]).await;

    let output = TempDir::new().unwrap();
    let mut saved = ScrapeProgress::new();
    saved.insert_record("Kenya", CountryRecord::empty("http://old", Utc::now()), "Africa");
    JsonProgressStore::in_dir(output.path()).save(&saved).unwrap();

    let config = create_test_config(&server.uri(), output.path());
    let options = ScrapeOptions {
        fresh: true,
        ..ScrapeOptions::default()
    };
    let outcome = run_scrape(config, options).await.expect("Scrape failed");

    assert_eq!(outcome.batch.skipped, 0);
    assert_eq!(outcome.batch.done, 1);
    assert_eq!(outcome.summary.with_data, 1);
}

#[tokio::test]
async fn test_request_ceiling_leaves_countries_pending() {
    let server = MockServer::start().await;
    let countries = ["Brazil", "Chile", "France", "Kenya", "Peru"];
    mount_site(&server, &countries).await;

    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), output.path());
    config.scraper.max_requests = 3;

    let first = run_scrape(config.clone(), ScrapeOptions::default())
        .await
        .expect("First run failed");

    assert_eq!(first.batch.attempted, 3);
    assert_eq!(first.batch.done, 3);
    assert_eq!(first.batch.pending, 2);
    assert!(first.batch.ceiling_reached);
    assert_eq!(first.published.as_ref().unwrap().total_countries, 3);

    // Only the countries fetched before the ceiling are saved as done
    let saved = JsonProgressStore::in_dir(output.path())
        .load()
        .unwrap()
        .expect("Progress file missing");
    let done: Vec<&str> = saved.country_records.keys().map(String::as_str).collect();
    assert_eq!(done, vec!["Brazil", "Chile", "France"]);
    assert!(!saved.is_done("Kenya"));
    assert!(!saved.is_done("Peru"));

    // The next run picks up the two countries left behind
    let second = run_scrape(config, ScrapeOptions::default())
        .await
        .expect("Second run failed");

    assert_eq!(second.batch.skipped, 3);
    assert_eq!(second.batch.done, 2);
    assert_eq!(second.batch.pending, 0);
    assert!(!second.batch.ceiling_reached);
    assert_eq!(second.published.as_ref().unwrap().total_countries, 5);
}

#[tokio::test]
async fn test_limit_truncates_directory() {
    let server = MockServer::start().await;
    mount_site(&server, &["Brazil", "Chile", "France"]).await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let options = ScrapeOptions {
        limit: Some(1),
        ..ScrapeOptions::default()
    };
    let outcome = run_scrape(config, options).await.expect("Scrape failed");

    assert_eq!(outcome.batch.attempted, 1);
    assert_eq!(outcome.summary.total_countries, 1);
}

#[tokio::test]
async fn test_country_failure_is_logged_and_run_continues() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_string(directory_page(&["Chile", "Peru"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(country_path(1, "Chile")))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(country_path(2, "Peru")))
        .respond_with(ResponseTemplate::new(200).set_body_string(country_page("Peru")))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let outcome = run_scrape(config, ScrapeOptions::default())
        .await
        .expect("Scrape failed");

    assert_eq!(outcome.batch.errored, 1);
    assert_eq!(outcome.batch.done, 1);
    assert_eq!(outcome.summary.errors, 1);

    let errors: Vec<ErrorLogEntry> = read_json(output.path(), "error-log.json");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].country, "Chile");
    assert!(errors[0].error.contains("404"));
}

#[tokio::test]
async fn test_directory_failure_still_publishes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/countries"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let outcome = run_scrape(config, ScrapeOptions::default())
        .await
        .expect("Directory failure must not abort the run");

    assert_eq!(outcome.batch.attempted, 0);
    assert_eq!(outcome.published.as_ref().unwrap().total_countries, 0);
    assert!(output.path().join("last-update.json").exists());

    let errors: Vec<ErrorLogEntry> = read_json(output.path(), "error-log.json");
    assert_eq!(errors[0].country, DIRECTORY_ERROR_KEY);
}

#[tokio::test]
async fn test_fetch_waits_out_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), output.path());
    // The rate-limit attempt comes on top of the retry budget
    config.scraper.max_retries = 1;
    let fetcher = HttpFetcher::new(&config.scraper, &config.user_agent).unwrap();

    let body = fetcher
        .fetch(&format!("{}/limited", server.uri()))
        .await
        .expect("Fetch failed");
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_fetch_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let fetcher = HttpFetcher::new(&config.scraper, &config.user_agent).unwrap();

    let body = fetcher
        .fetch(&format!("{}/flaky", server.uri()))
        .await
        .expect("Fetch failed");
    assert_eq!(body, "recovered");
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let fetcher = HttpFetcher::new(&config.scraper, &config.user_agent).unwrap();

    let error = fetcher
        .fetch(&format!("{}/down", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(error.status(), Some(500));
}

#[tokio::test]
async fn test_fetch_retries_client_errors_up_to_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let config = create_test_config(&server.uri(), output.path());
    let fetcher = HttpFetcher::new(&config.scraper, &config.user_agent).unwrap();

    let error = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(error, FetchError::Http { status: 404, .. }));
    assert!(!error.is_timeout());
}

#[tokio::test]
async fn test_fetch_timeout_is_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_millis(1500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let output = TempDir::new().unwrap();
    let mut config = create_test_config(&server.uri(), output.path());
    config.scraper.timeout_ms = 1000;
    config.scraper.max_retries = 1;
    let fetcher = HttpFetcher::new(&config.scraper, &config.user_agent).unwrap();

    let error = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(error, FetchError::Network { timed_out: true, .. }));
    assert!(error.is_timeout());
    assert_eq!(error.status(), None);
}

#[tokio::test]
async fn test_publish_failure_keeps_run_result() {
    let server = MockServer::start().await;
    mount_site(&server, &["Kenya"]).await;

    let output = TempDir::new().unwrap();
    // A directory in the way makes the final rename fail
    std::fs::create_dir(output.path().join("countries-db.json")).unwrap();

    let config = create_test_config(&server.uri(), output.path());
    let outcome = run_scrape(config, ScrapeOptions::default())
        .await
        .expect("Publish failure must not abort the run");

    assert_eq!(outcome.batch.done, 1);
    assert_eq!(outcome.summary.with_data, 1);
    assert!(outcome.published.is_none());

    // Progress is still saved for the next run
    let saved = JsonProgressStore::in_dir(output.path())
        .load()
        .unwrap()
        .expect("Progress file missing");
    assert!(saved.is_done("Kenya"));
}
