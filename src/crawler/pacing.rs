//! Pacing between country requests
//!
//! One country is processed at a time, so pacing is a single sleep between
//! two consecutive attempts: the base delay plus random jitter, or a longer
//! fixed delay after a failure.

use crate::config::ScraperConfig;
use rand::Rng;
use std::time::Duration;

/// Delay policy between consecutive country attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    base: Duration,
    jitter_max: Duration,
    error_multiplier: u32,
}

impl Pacer {
    pub fn new(base: Duration, jitter_max: Duration, error_multiplier: u32) -> Self {
        Self {
            base,
            jitter_max,
            error_multiplier: error_multiplier.max(1),
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.delay(),
            Duration::from_millis(config.random_delay_max_ms),
            config.error_delay_multiplier,
        )
    }

    /// Delay to observe before the next attempt
    ///
    /// After an error the base delay is multiplied and no jitter is added.
    pub fn next_delay(&self, after_error: bool) -> Duration {
        if after_error {
            return self.base.saturating_mul(self.error_multiplier);
        }

        let jitter_ms = self.jitter_max.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base + Duration::from_millis(jitter)
    }

    /// Sleeps for [`Pacer::next_delay`]
    pub async fn wait(&self, after_error: bool) {
        let delay = self.next_delay(after_error);
        tracing::debug!("Waiting {:?} before next country", delay);
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_within_jitter_bounds() {
        let pacer = Pacer::new(Duration::from_millis(2000), Duration::from_millis(1000), 2);
        for _ in 0..50 {
            let delay = pacer.next_delay(false);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_error_delay_is_multiplied() {
        let pacer = Pacer::new(Duration::from_millis(2000), Duration::from_millis(1000), 3);
        assert_eq!(pacer.next_delay(true), Duration::from_millis(6000));
    }

    #[test]
    fn test_zero_jitter() {
        let pacer = Pacer::new(Duration::from_millis(500), Duration::ZERO, 1);
        assert_eq!(pacer.next_delay(false), Duration::from_millis(500));
        assert_eq!(pacer.next_delay(true), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_wait_sleeps() {
        let pacer = Pacer::new(Duration::from_millis(10), Duration::ZERO, 1);
        let start = std::time::Instant::now();
        pacer.wait(false).await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
