//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the scraper, including:
//! - Building HTTP clients with proper user agent strings
//! - Retry logic with exponential backoff for every failed request
//! - `Retry-After` compliance for rate-limited responses
//! - Error classification into network and HTTP failures

use crate::config::{ScraperConfig, UserAgentConfig};
use crate::{FetchError, FetchResult};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::time::{Duration, SystemTime};

/// Longest `Retry-After` wait honoured
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Upper bound for the connect phase of a request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use travel_health_scraper::config::UserAgentConfig;
/// use travel_health_scraper::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "TravelHealthScraper".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(15)).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Formats the user agent: `Name/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Retrying page fetcher
///
/// Holds no state that changes between requests; pacing between countries is
/// the coordinator's job.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_backoff: Duration,
    rate_limit_fallback: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher from the scraper and user agent settings
    pub fn new(scraper: &ScraperConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, scraper.timeout())?;
        Ok(Self::with_client(
            client,
            scraper.max_retries,
            scraper.retry_backoff(),
            scraper.rate_limit_fallback(),
        ))
    }

    pub fn with_client(
        client: Client,
        max_retries: u32,
        retry_backoff: Duration,
        rate_limit_fallback: Duration,
    ) -> Self {
        Self {
            client,
            max_retries: max_retries.max(1),
            retry_backoff,
            rate_limit_fallback,
        }
    }

    /// Fetches a URL and returns its body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Network error or timeout | Retry with backoff `retry_backoff * 2^(attempt-1)` |
    /// | HTTP 429, or any failure with `Retry-After` | Wait as instructed, one extra attempt |
    /// | Any other HTTP error | Retry with backoff |
    ///
    /// At most `max_retries` attempts are made; the rate-limit attempt does not
    /// count against them.
    pub async fn fetch(&self, url: &str) -> FetchResult<String> {
        let mut attempt = 1;
        let mut rate_limit_wait_used = false;

        loop {
            let error = match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.text().await.map_err(|e| network_error(url, &e));
                    }

                    let retry_after = retry_after(response.headers(), SystemTime::now());
                    if !rate_limit_wait_used
                        && (status == StatusCode::TOO_MANY_REQUESTS || retry_after.is_some())
                    {
                        rate_limit_wait_used = true;
                        let wait = retry_after.unwrap_or(self.rate_limit_fallback);
                        tracing::warn!(
                            "HTTP {} for {}, waiting {:?} before one more attempt",
                            status.as_u16(),
                            url,
                            wait
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    FetchError::Http {
                        url: url.to_string(),
                        status: status.as_u16(),
                    }
                }
                Err(e) => network_error(url, &e),
            };

            if attempt >= self.max_retries {
                return Err(error);
            }

            let backoff = self.backoff_for(attempt);
            tracing::debug!(
                "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                attempt,
                self.max_retries,
                url,
                error,
                backoff
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Backoff before the attempt following `attempt`
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_backoff.saturating_mul(factor)
    }
}

fn network_error(url: &str, error: &reqwest::Error) -> FetchError {
    FetchError::Network {
        url: url.to_string(),
        message: error.to_string(),
        timed_out: error.is_timeout(),
    }
}

fn retry_after(headers: &HeaderMap, now: SystemTime) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_retry_after(value, now))
}

/// Parses a `Retry-After` value given as delay-seconds or an HTTP-date
///
/// Dates in the past mean "now". The result is capped at [`MAX_RETRY_AFTER`].
pub fn parse_retry_after(value: &str, now: SystemTime) -> Option<Duration> {
    let value = value.trim();
    let wait = match value.parse::<u64>() {
        Ok(seconds) => Duration::from_secs(seconds),
        Err(_) => {
            let date = httpdate::parse_http_date(value).ok()?;
            date.duration_since(now).unwrap_or(Duration::ZERO)
        }
    };
    Some(wait.min(MAX_RETRY_AFTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestScraper".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        let client = build_http_client(&config, Duration::from_secs(15));
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        let config = create_test_config();
        assert_eq!(
            user_agent_string(&config),
            "TestScraper/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let client = build_http_client(&create_test_config(), Duration::from_secs(5)).unwrap();
        let fetcher = HttpFetcher::with_client(
            client,
            4,
            Duration::from_millis(100),
            Duration::from_millis(10),
        );

        assert_eq!(fetcher.backoff_for(1), Duration::from_millis(100));
        assert_eq!(fetcher.backoff_for(2), Duration::from_millis(200));
        assert_eq!(fetcher.backoff_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let now = SystemTime::now();
        assert_eq!(parse_retry_after("120", now), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after(" 0 ", now), Some(Duration::ZERO));
        assert_eq!(parse_retry_after("999999", now), Some(MAX_RETRY_AFTER));
        assert_eq!(parse_retry_after("soon", now), None);
    }

    #[test]
    fn test_parse_retry_after_http_date() {
        let now = httpdate::parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();

        assert_eq!(
            parse_retry_after("Sun, 06 Nov 1994 08:50:37 GMT", now),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            parse_retry_after("Sun, 06 Nov 1994 08:00:00 GMT", now),
            Some(Duration::ZERO)
        );
    }
}
