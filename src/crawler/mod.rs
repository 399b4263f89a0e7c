//! Crawler module for fetching and processing country pages
//!
//! This module contains the batch pipeline, including:
//! - HTTP fetching with retry logic
//! - Country directory parsing
//! - Pacing between country requests
//! - One-country record building
//! - Overall batch coordination

mod coordinator;
mod directory;
mod fetcher;
mod pacing;
mod record;

pub use coordinator::{BatchReport, Coordinator, DIRECTORY_ERROR_KEY};
pub use directory::parse_country_directory;
pub use fetcher::{build_http_client, parse_retry_after, user_agent_string, HttpFetcher, MAX_RETRY_AFTER};
pub use pacing::Pacer;
pub use record::RecordBuilder;

use crate::config::Config;
use crate::output::{publish, PublishReport, RunSummary};
use crate::storage::JsonProgressStore;
use crate::{Result, ScraperError};

/// Options for one scrape run
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    /// Ignore saved progress
    pub fresh: bool,

    /// Only process the first N directory entries
    pub limit: Option<usize>,

    /// Hash of the configuration file, published in `last-update.json`
    pub config_hash: Option<String>,
}

/// Everything a finished run reports
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub batch: BatchReport,
    pub summary: RunSummary,

    /// `None` if writing the output files failed
    pub published: Option<PublishReport>,
}

/// Runs a complete scrape
///
/// This is the main entry point for a batch run. It will:
/// 1. Create the output directory
/// 2. Load saved progress unless `fresh` is set
/// 3. Fetch and parse the country directory
/// 4. Process every country not yet done, within the request ceiling
/// 5. Publish the partitions, index and metadata files
///
/// Failing to create the output directory is the only fatal runtime error.
/// Country and directory failures end up in `error-log.json`; failed progress
/// or output writes are logged and leave the run's result in place.
///
/// # Example
///
/// ```no_run
/// use travel_health_scraper::config::load_config;
/// use travel_health_scraper::crawler::{run_scrape, ScrapeOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("scraper.toml"))?;
/// let outcome = run_scrape(config, ScrapeOptions::default()).await?;
/// if let Some(published) = &outcome.published {
///     println!("{} countries published", published.total_countries);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn run_scrape(config: Config, options: ScrapeOptions) -> Result<ScrapeOutcome> {
    let output_dir = config.output.dir();
    std::fs::create_dir_all(&output_dir).map_err(|source| ScraperError::OutputDir {
        path: output_dir.display().to_string(),
        source,
    })?;

    let warning_bytes = config.output.partition_warning_bytes;
    let store = JsonProgressStore::in_dir(&output_dir);
    let mut coordinator = Coordinator::new(config, store, options.fresh)?;

    let mut countries = coordinator.fetch_directory().await;
    if let Some(limit) = options.limit {
        if countries.len() > limit {
            tracing::info!("Limiting run to the first {} of {} countries", limit, countries.len());
            countries.truncate(limit);
        }
    }

    let batch = coordinator.run(&countries).await?;

    let published = match publish(
        &output_dir,
        coordinator.progress(),
        coordinator.error_log(),
        options.config_hash.as_deref(),
        warning_bytes,
    ) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!("Failed to publish output files: {}", e);
            None
        }
    };

    let summary = RunSummary::from_progress(
        coordinator.progress(),
        coordinator.error_log().len(),
        batch.skipped as usize,
    );

    Ok(ScrapeOutcome {
        batch,
        summary,
        published,
    })
}
