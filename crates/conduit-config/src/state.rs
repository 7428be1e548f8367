use std::time::Duration;

use serde::Deserialize;
use url::Url;

/// Health state configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Storage backend for health facts
    #[serde(default)]
    pub storage: StateStorage,
}

/// Quota state configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Storage backend for usage counters
    #[serde(default)]
    pub storage: StateStorage,
    /// Length of the fixed quota window
    #[serde(default = "default_window", deserialize_with = "crate::duration::deserialize")]
    pub window: Duration,
    /// What a quota unit counts
    #[serde(default)]
    pub unit: QuotaUnit,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            storage: StateStorage::default(),
            window: default_window(),
            unit: QuotaUnit::default(),
        }
    }
}

/// Unit charged against a backend's quota
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaUnit {
    /// One unit per successful request
    #[default]
    Requests,
    /// Total tokens reported by the backend
    Tokens,
}

/// Where shared health/quota state lives
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStorage {
    /// In-process storage (single instance only)
    #[default]
    Memory,
    /// Redis-backed storage (shared across instances)
    Redis(RedisConfig),
}

/// Redis connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: Url,
    /// Prefix for every key written
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Connection timeout
    #[serde(default = "default_connect_timeout", deserialize_with = "crate::duration::deserialize")]
    pub connect_timeout: Duration,
}

const fn default_window() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_key_prefix() -> String {
    "conduit".to_owned()
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}
