use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the scraper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Target site and pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Base URL used to resolve relative country links
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Directory page listing every country
    #[serde(rename = "countries-url")]
    pub countries_url: String,

    /// Base delay between two country requests (milliseconds)
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Upper bound of the random jitter added to the base delay (milliseconds)
    #[serde(rename = "random-delay-max-ms", default = "default_random_delay_max_ms")]
    pub random_delay_max_ms: u64,

    /// Multiplier applied to the base delay after a failed country
    #[serde(
        rename = "error-delay-multiplier",
        default = "default_error_delay_multiplier"
    )]
    pub error_delay_multiplier: u32,

    /// Attempts per URL before giving up
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff step between attempts; doubles on every retry (milliseconds)
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Wait used for HTTP 429 responses without a usable Retry-After (milliseconds)
    #[serde(
        rename = "rate-limit-fallback-ms",
        default = "default_rate_limit_fallback_ms"
    )]
    pub rate_limit_fallback_ms: u64,

    /// Whole-request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of processed countries between progress checkpoints
    #[serde(
        rename = "progress-save-interval",
        default = "default_progress_save_interval"
    )]
    pub progress_save_interval: u32,

    /// Request ceiling for a single run
    #[serde(rename = "max-requests", default = "default_max_requests")]
    pub max_requests: u32,
}

impl ScraperConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn rate_limit_fallback(&self) -> Duration {
        Duration::from_millis(self.rate_limit_fallback_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the scraper
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the scraper
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the scraper
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for scraper-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving every output file and the progress checkpoint
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Serialized partition size above which a warning is logged (bytes)
    #[serde(
        rename = "partition-warning-bytes",
        default = "default_partition_warning_bytes"
    )]
    pub partition_warning_bytes: usize,
}

impl OutputConfig {
    pub fn dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_random_delay_max_ms() -> u64 {
    1000
}

fn default_error_delay_multiplier() -> u32 {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_rate_limit_fallback_ms() -> u64 {
    5000
}

fn default_timeout_ms() -> u64 {
    15_000
}

fn default_progress_save_interval() -> u32 {
    10
}

fn default_max_requests() -> u32 {
    1000
}

fn default_partition_warning_bytes() -> usize {
    800_000
}
