//! Shared backend state consumed by the resolver
//!
//! Health (cooldowns, consecutive failures) and quota (usage per fixed
//! window) live behind narrow async traits so the routing core never owns
//! mutable shared state. Stores are either in-process or Redis-backed.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

mod error;
mod health;
mod quota;
pub mod storage;

use std::collections::HashMap;
use std::sync::Arc;

use conduit_config::{Config, StateStorage};

pub use error::StateError;
pub use health::{HealthStatus, HealthStore};
pub use quota::{QuotaStatus, QuotaStore};
use storage::memory::{MemoryHealthStore, MemoryQuotaStore};
use storage::redis::{RedisHealthStore, RedisQuotaStore};

/// Create the health store selected by configuration
pub async fn create_health_store(config: &Config) -> Result<Arc<dyn HealthStore>, StateError> {
    match &config.health.storage {
        StateStorage::Memory => Ok(Arc::new(MemoryHealthStore::new())),
        StateStorage::Redis(redis) => Ok(Arc::new(RedisHealthStore::connect(redis).await?)),
    }
}

/// Create the quota store selected by configuration
///
/// Limits come from each provider's `quota` setting; providers without one
/// are unlimited.
pub async fn create_quota_store(config: &Config) -> Result<Arc<dyn QuotaStore>, StateError> {
    let limits = quota_limits(config);
    let window = config.quota.window;

    match &config.quota.storage {
        StateStorage::Memory => Ok(Arc::new(MemoryQuotaStore::new(limits, window))),
        StateStorage::Redis(redis) => Ok(Arc::new(RedisQuotaStore::connect(redis, limits, window).await?)),
    }
}

fn quota_limits(config: &Config) -> HashMap<String, u64> {
    config
        .providers
        .iter()
        .filter_map(|(name, provider)| provider.quota.map(|limit| (name.clone(), limit)))
        .collect()
}
