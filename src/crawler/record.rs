//! One country: fetch its page once, extract everything from that document

use crate::crawler::HttpFetcher;
use crate::extract::extract_country_record;
use crate::model::{CountryListing, CountryRecord};
use crate::{Result, ScraperError};
use chrono::Utc;

/// Builds country records from their advisory pages
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    fetcher: HttpFetcher,
}

impl RecordBuilder {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self { fetcher }
    }

    /// Fetches and extracts the record for `listing`
    ///
    /// Fails only when the page cannot be fetched; a page that yields nothing
    /// is an empty record with a note.
    pub async fn build_record(&self, listing: &CountryListing) -> Result<CountryRecord> {
        tracing::info!("Processing {} ({})", listing.name, listing.url);

        let html = self
            .fetcher
            .fetch(&listing.url)
            .await
            .map_err(|source| ScraperError::Extraction {
                country: listing.name.clone(),
                source,
            })?;

        Ok(extract_country_record(&html, listing, Utc::now()))
    }

    pub fn fetcher(&self) -> &HttpFetcher {
        &self.fetcher
    }
}
