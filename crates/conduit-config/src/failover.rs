use std::time::Duration;

use serde::Deserialize;

/// Failover orchestration settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailoverConfig {
    /// Maximum resolve-and-dispatch attempts per logical request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles on every further attempt
    #[serde(default = "default_base_delay", deserialize_with = "crate::duration::deserialize")]
    pub base_delay: Duration,
    /// Upper bound on a single backoff delay
    #[serde(default = "default_max_delay", deserialize_with = "crate::duration::deserialize")]
    pub max_delay: Duration,
    /// Random jitter as a fraction of the delay (0.0 to 1.0)
    #[serde(default)]
    pub jitter: f64,
    /// Report failed backends to the health store
    #[serde(default = "crate::default_true")]
    pub mark_unhealthy: bool,
    /// Cooldown applied when a backend is reported unhealthy
    #[serde(default = "default_cooldown", deserialize_with = "crate::duration::deserialize")]
    pub cooldown: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            jitter: 0.0,
            mark_unhealthy: true,
            cooldown: default_cooldown(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_base_delay() -> Duration {
    Duration::from_millis(200)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

const fn default_cooldown() -> Duration {
    Duration::from_secs(30)
}
