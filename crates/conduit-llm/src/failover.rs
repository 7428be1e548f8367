//! Backoff between failover attempts

use std::time::Duration;

use conduit_config::FailoverConfig;
use rand::Rng;

/// Exponential backoff with optional jitter
///
/// The delay before attempt `n + 1` is `base * 2^n`, capped at `max`, then
/// spread by up to `jitter` of itself in either direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    jitter: f64,
}

impl BackoffPolicy {
    /// Policy with explicit bounds
    pub const fn new(base: Duration, max: Duration, jitter: f64) -> Self {
        Self { base, max, jitter }
    }

    /// Policy from `[failover]` settings
    pub const fn from_config(config: &FailoverConfig) -> Self {
        Self::new(config.base_delay, config.max_delay, config.jitter)
    }

    /// Delay before the attempt after `attempt` (zero-based), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay before the attempt after `attempt`, jitter applied
    ///
    /// Never exceeds the configured maximum.
    pub fn delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay(attempt);
        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }

        let spread = rand::rng().random_range(-self.jitter..=self.jitter);
        delay.mul_f64((1.0 + spread).max(0.0)).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&FailoverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_until_capped() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_millis(500), 0.0);

        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(500));
        assert_eq!(policy.delay(40), Duration::from_millis(500));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = BackoffPolicy::new(Duration::from_millis(1000), Duration::from_secs(10), 0.2);

        for _ in 0..100 {
            let delay = policy.delay(0);
            assert!(delay >= Duration::from_millis(800), "{delay:?}");
            assert!(delay <= Duration::from_millis(1200), "{delay:?}");
        }
    }

    #[test]
    fn jitter_never_exceeds_max() {
        let policy = BackoffPolicy::new(Duration::from_millis(400), Duration::from_millis(500), 0.5);

        for _ in 0..100 {
            let delay = policy.delay(3);
            assert!(delay <= Duration::from_millis(500), "{delay:?}");
            assert!(delay >= Duration::from_millis(250), "{delay:?}");
        }
    }

    #[test]
    fn zero_base_never_waits() {
        let policy = BackoffPolicy::new(Duration::ZERO, Duration::from_secs(1), 0.5);
        assert_eq!(policy.delay(3), Duration::ZERO);
    }

    #[test]
    fn defaults_follow_config() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay(0), Duration::from_millis(200));
        assert_eq!(policy.base_delay(10), Duration::from_secs(5));
    }
}
