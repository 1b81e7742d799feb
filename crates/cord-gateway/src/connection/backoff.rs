//! Reconnect backoff
//!
//! `delay(n) = min(initial * factor^n, max) + uniform(0, jitter)`, capped at `max`.

use rand::Rng;
use std::time::Duration;

/// Backoff policy
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    pub factor: f64,
    pub jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: Duration::from_secs(1),
        }
    }
}

/// Attempt counter that yields successive reconnect delays
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of delays handed out since the last reset
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before the next attempt, advancing the counter
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        let jitter_ms = u64::try_from(self.config.jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));

        (base + jitter).min(self.config.max)
    }

    /// Start over after a successful handshake
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    fn base_delay(&self, attempt: u32) -> Duration {
        let max_secs = self.config.max.as_secs_f64();
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.config.initial.as_secs_f64() * self.config.factor.powi(exponent);

        if secs.is_finite() && secs < max_secs {
            Duration::from_secs_f64(secs.max(0.0))
        } else {
            self.config.max
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter() -> BackoffConfig {
        BackoffConfig {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: Duration::ZERO,
        }
    }

    #[test]
    fn test_exponential_growth() {
        let mut backoff = Backoff::new(no_jitter());
        let delays: Vec<u64> = (0..8).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(backoff.attempt(), 8);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(no_jitter());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_never_exceeds_max() {
        let mut backoff = Backoff::new(BackoffConfig {
            jitter: Duration::from_secs(5),
            ..no_jitter()
        });
        for _ in 0..200 {
            assert!(backoff.next_delay() <= Duration::from_secs(60));
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let config = BackoffConfig {
            jitter: Duration::from_millis(500),
            ..no_jitter()
        };
        for _ in 0..100 {
            let delay = Backoff::new(config.clone()).next_delay();
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_millis(1_500));
        }
    }

    #[test]
    fn test_huge_attempt_counts_saturate() {
        let backoff = Backoff::new(no_jitter());
        assert_eq!(backoff.base_delay(u32::MAX), Duration::from_secs(60));
    }
}
