//! Batch coordinator - main scrape orchestration logic
//!
//! This module contains the sequential country loop, including:
//! - Loading or discarding saved progress
//! - Fetching the country directory
//! - Driving every country through its state machine
//! - Pacing, the per-run request ceiling and periodic checkpoints

use crate::config::Config;
use crate::crawler::directory::parse_country_directory;
use crate::crawler::pacing::Pacer;
use crate::crawler::record::RecordBuilder;
use crate::crawler::HttpFetcher;
use crate::model::{CountryListing, ErrorLogEntry};
use crate::region::region_for;
use crate::state::{CountryState, ScrapeProgress};
use crate::storage::ProgressStore;
use crate::{Result, ScraperError};
use chrono::Utc;
use std::collections::HashMap;
use url::Url;

/// Error log key used for directory failures
pub const DIRECTORY_ERROR_KEY: &str = "(directory)";

/// Counts for one call to [`Coordinator::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Country page requests issued in this run
    pub attempted: u32,

    /// Countries that reached `Done`
    pub done: u32,

    /// `Done` countries whose record holds no entries
    pub empty: u32,

    pub errored: u32,

    /// Countries already present in loaded progress
    pub skipped: u32,

    /// Countries left untouched when the run stopped
    pub pending: u32,

    /// True if the request ceiling stopped the loop
    pub ceiling_reached: bool,
}

/// Main batch coordinator structure
///
/// Owns every piece of mutable run state: the progress snapshot, per-country
/// states and the error log. Nothing is shared with other tasks.
pub struct Coordinator<S: ProgressStore> {
    config: Config,
    builder: RecordBuilder,
    pacer: Pacer,
    store: S,
    progress: ScrapeProgress,
    states: HashMap<String, CountryState>,
    error_log: Vec<ErrorLogEntry>,
}

impl<S: ProgressStore> Coordinator<S> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The scraper configuration
    /// * `store` - Where progress snapshots are loaded from and saved to
    /// * `fresh` - Ignore any saved progress
    pub fn new(config: Config, store: S, fresh: bool) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.scraper, &config.user_agent)?;
        Ok(Self::with_fetcher(config, fetcher, store, fresh))
    }

    /// Creates a coordinator around an existing fetcher
    pub fn with_fetcher(config: Config, fetcher: HttpFetcher, store: S, fresh: bool) -> Self {
        let progress = load_progress(&store, fresh);
        let pacer = Pacer::from_config(&config.scraper);

        Self {
            config,
            builder: RecordBuilder::new(fetcher),
            pacer,
            store,
            progress,
            states: HashMap::new(),
            error_log: Vec::new(),
        }
    }

    /// Fetches and parses the country directory
    ///
    /// A failed fetch or an empty directory is logged and recorded in the
    /// error log; the result is then empty and the run publishes whatever
    /// earlier progress holds.
    pub async fn fetch_directory(&mut self) -> Vec<CountryListing> {
        let countries_url = self.config.scraper.countries_url.clone();
        tracing::info!("Fetching country directory from {}", countries_url);

        let base_url = match Url::parse(&self.config.scraper.base_url) {
            Ok(url) => url,
            Err(e) => {
                self.log_error(DIRECTORY_ERROR_KEY, ScraperError::UrlParse(e));
                return Vec::new();
            }
        };

        match self.builder.fetcher().fetch(&countries_url).await {
            Ok(html) => {
                let countries = parse_country_directory(&html, &base_url);
                if countries.is_empty() {
                    self.log_error(DIRECTORY_ERROR_KEY, "No countries found on directory page");
                } else {
                    tracing::info!("Found {} countries", countries.len());
                }
                countries
            }
            Err(source) => {
                self.log_error(
                    DIRECTORY_ERROR_KEY,
                    ScraperError::Fetch {
                        url: countries_url,
                        source,
                    },
                );
                Vec::new()
            }
        }
    }

    /// Runs the country loop over `countries` in order
    ///
    /// Countries already in the loaded progress are skipped without a request.
    /// The loop stops early once `max-requests` country requests were issued in
    /// this run; the remaining countries stay pending. Progress is saved every
    /// `progress-save-interval` completed countries and once at the end; a
    /// failed save is logged and the run goes on.
    pub async fn run(&mut self, countries: &[CountryListing]) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let save_interval = self.config.scraper.progress_save_interval.max(1);
        let max_requests = self.config.scraper.max_requests;
        let mut since_checkpoint = 0u32;
        let mut last_attempt_failed: Option<bool> = None;

        for listing in countries {
            self.states
                .entry(listing.name.clone())
                .or_insert(CountryState::Pending);
        }

        tracing::info!(
            "Starting batch of {} countries ({} already done)",
            countries.len(),
            countries.iter().filter(|c| self.progress.is_done(&c.name)).count()
        );

        for listing in countries {
            let name = listing.name.as_str();
            if self.state_of(name).is_some_and(|state| state.is_terminal()) {
                continue;
            }

            if self.progress.is_done(name) {
                tracing::debug!("Skipping {}, already done", name);
                self.transition(name, CountryState::Skipped)?;
                report.skipped += 1;
                continue;
            }

            if report.attempted >= max_requests {
                tracing::warn!(
                    "Request ceiling of {} reached, stopping with countries left",
                    max_requests
                );
                report.ceiling_reached = true;
                break;
            }

            if let Some(failed) = last_attempt_failed {
                self.pacer.wait(failed).await;
            }

            self.transition(name, CountryState::InProgress)?;
            report.attempted += 1;
            self.progress.request_count += 1;

            match self.builder.build_record(listing).await {
                Ok(record) => {
                    if record.is_empty() {
                        report.empty += 1;
                    }
                    let region = region_for(name);
                    self.progress.insert_record(name, record, region);
                    self.transition(name, CountryState::Done)?;
                    report.done += 1;
                    last_attempt_failed = Some(false);

                    since_checkpoint += 1;
                    if since_checkpoint >= save_interval {
                        since_checkpoint = 0;
                        if let Err(e) = self.checkpoint() {
                            tracing::error!("Failed to save progress: {}", e);
                        }
                    }
                }
                Err(e) => {
                    self.log_error(name, &e);
                    self.transition(name, CountryState::Errored)?;
                    report.errored += 1;
                    last_attempt_failed = Some(true);
                }
            }
        }

        report.pending = countries
            .iter()
            .filter(|c| self.state_of(&c.name) == Some(CountryState::Pending))
            .count() as u32;

        if let Err(e) = self.checkpoint() {
            tracing::error!("Failed to save final progress: {}", e);
        }

        tracing::info!(
            "Batch finished: {} done ({} empty), {} errors, {} skipped, {} pending",
            report.done,
            report.empty,
            report.errored,
            report.skipped,
            report.pending
        );

        Ok(report)
    }

    /// Saves the current progress snapshot
    pub fn checkpoint(&mut self) -> Result<()> {
        self.progress.last_saved = Some(Utc::now());
        self.store.save(&self.progress)?;
        tracing::debug!(
            "Saved progress: {} countries done",
            self.progress.record_count()
        );
        Ok(())
    }

    /// Moves `country` to `next`, rejecting moves the state machine forbids
    fn transition(&mut self, country: &str, next: CountryState) -> Result<()> {
        let current = self.state_of(country).unwrap_or(CountryState::Pending);
        if !current.can_transition_to(next) {
            return Err(ScraperError::InvalidTransition {
                country: country.to_string(),
                from: current,
                to: next,
            });
        }
        self.states.insert(country.to_string(), next);
        Ok(())
    }

    fn log_error(&mut self, country: &str, error: impl std::fmt::Display) {
        tracing::error!("Error processing {}: {}", country, error);
        self.error_log.push(ErrorLogEntry::new(country, error));
    }

    /// State of `country` in this run, `None` if it was never listed
    pub fn state_of(&self, country: &str) -> Option<CountryState> {
        self.states.get(country).copied()
    }

    pub fn progress(&self) -> &ScrapeProgress {
        &self.progress
    }

    pub fn error_log(&self) -> &[ErrorLogEntry] {
        &self.error_log
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Loads saved progress, starting fresh when asked to or when it is unreadable
fn load_progress<S: ProgressStore>(store: &S, fresh: bool) -> ScrapeProgress {
    if fresh {
        tracing::info!("Starting fresh, saved progress ignored");
        return ScrapeProgress::new();
    }

    match store.load() {
        Ok(Some(progress)) => {
            tracing::info!(
                "Resuming with {} countries already done",
                progress.record_count()
            );
            progress
        }
        Ok(None) => {
            tracing::info!("No saved progress found, starting new run");
            ScrapeProgress::new()
        }
        Err(e) => {
            tracing::warn!("Could not read saved progress ({}), starting fresh", e);
            ScrapeProgress::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OutputConfig, ScraperConfig, UserAgentConfig};
    use crate::model::CountryRecord;
    use crate::storage::{StorageError, StorageResult};

    #[derive(Default)]
    struct MemoryStore {
        saved: Option<ScrapeProgress>,
        saves: u32,
        corrupt: bool,
        read_only: bool,
    }

    impl ProgressStore for MemoryStore {
        fn load(&self) -> StorageResult<Option<ScrapeProgress>> {
            if self.corrupt {
                let err = serde_json::from_str::<ScrapeProgress>("{").unwrap_err();
                return Err(StorageError::Serialization(err));
            }
            Ok(self.saved.clone())
        }

        fn save(&mut self, progress: &ScrapeProgress) -> StorageResult<()> {
            if self.read_only {
                return Err(StorageError::Io {
                    path: "memory".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.saved = Some(progress.clone());
            self.saves += 1;
            Ok(())
        }
    }

    fn create_test_config() -> Config {
        Config {
            scraper: ScraperConfig {
                base_url: "http://127.0.0.1:9".to_string(),
                countries_url: "http://127.0.0.1:9/countries".to_string(),
                delay_ms: 0,
                random_delay_max_ms: 0,
                error_delay_multiplier: 1,
                max_retries: 1,
                retry_backoff_ms: 0,
                rate_limit_fallback_ms: 0,
                timeout_ms: 1000,
                progress_save_interval: 1,
                max_requests: 10,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestScraper".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                output_dir: "./data".to_string(),
                partition_warning_bytes: 800_000,
            },
        }
    }

    fn listing(name: &str) -> CountryListing {
        CountryListing::new(name, format!("http://127.0.0.1:9/country/{}", name))
    }

    fn done_progress(names: &[&str]) -> ScrapeProgress {
        let mut progress = ScrapeProgress::new();
        for name in names {
            progress.insert_record(name, CountryRecord::empty("http://x", Utc::now()), "Other");
        }
        progress
    }

    #[tokio::test]
    async fn test_all_done_skips_without_requests() {
        let store = MemoryStore {
            saved: Some(done_progress(&["Kenya", "Peru"])),
            ..MemoryStore::default()
        };
        let mut coordinator = Coordinator::new(create_test_config(), store, false).unwrap();

        let report = coordinator
            .run(&[listing("Kenya"), listing("Peru")])
            .await
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.attempted, 0);
        assert_eq!(coordinator.state_of("Kenya"), Some(CountryState::Skipped));
        assert_eq!(coordinator.store.saves, 1);
    }

    #[tokio::test]
    async fn test_failed_final_save_keeps_report() {
        let store = MemoryStore {
            saved: Some(done_progress(&["Kenya", "Peru"])),
            read_only: true,
            ..MemoryStore::default()
        };
        let mut coordinator = Coordinator::new(create_test_config(), store, false).unwrap();

        let report = coordinator
            .run(&[listing("Kenya"), listing("Peru")])
            .await
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(coordinator.store.saves, 0);
        assert_eq!(coordinator.progress().record_count(), 2);
    }

    #[tokio::test]
    async fn test_fresh_ignores_saved_progress() {
        let store = MemoryStore {
            saved: Some(done_progress(&["Kenya"])),
            ..MemoryStore::default()
        };
        let coordinator = Coordinator::new(create_test_config(), store, true).unwrap();
        assert_eq!(coordinator.progress().record_count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_progress_starts_fresh() {
        let store = MemoryStore {
            corrupt: true,
            ..MemoryStore::default()
        };
        let coordinator = Coordinator::new(create_test_config(), store, false).unwrap();
        assert_eq!(coordinator.progress().record_count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_country_is_errored() {
        let mut coordinator =
            Coordinator::new(create_test_config(), MemoryStore::default(), false).unwrap();

        let report = coordinator.run(&[listing("Kenya")]).await.unwrap();

        assert_eq!(report.errored, 1);
        assert_eq!(coordinator.state_of("Kenya"), Some(CountryState::Errored));
        assert_eq!(coordinator.error_log().len(), 1);
        assert_eq!(coordinator.error_log()[0].country, "Kenya");
        assert!(!coordinator.progress().is_done("Kenya"));
    }

    #[tokio::test]
    async fn test_invalid_transition_rejected() {
        let mut coordinator =
            Coordinator::new(create_test_config(), MemoryStore::default(), false).unwrap();

        coordinator.transition("Kenya", CountryState::InProgress).unwrap();
        let err = coordinator
            .transition("Kenya", CountryState::Skipped)
            .unwrap_err();
        assert!(matches!(err, ScraperError::InvalidTransition { .. }));
    }
}
