//! Travel Health Scraper: health-advisory pages to a bounded data set
//!
//! This crate fetches per-country travel health pages, extracts vaccine
//! recommendations, other health risks and malaria guidance from markup whose
//! structure is not fixed, and publishes the result as compressed,
//! region-partitioned JSON files sized for client-side storage.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod model;
pub mod output;
pub mod region;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for scraper operations
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: FetchError },

    #[error("Extraction failed for {country}: {source}")]
    Extraction { country: String, source: FetchError },

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid state transition for {country}: {from} -> {to}")]
    InvalidTransition {
        country: String,
        from: state::CountryState,
        to: state::CountryState,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors produced by the HTTP fetcher
///
/// Timeouts are reported as network errors with `timed_out` set; callers
/// treat both the same way.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        message: String,
        timed_out: bool,
    },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },
}

impl FetchError {
    /// Returns true if the failure was a request timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { timed_out: true, .. })
    }

    /// Returns the HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network { .. } => None,
        }
    }
}

/// Result type alias for scraper operations
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for fetch operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CountryListing, CountryRecord, MalariaInfo, RiskEntry, VaccineEntry};
pub use region::region_for;
pub use state::{CountryState, ScrapeProgress};
