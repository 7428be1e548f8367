use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use conduit_config::RedisConfig;
use redis::Script;
use redis::aio::ConnectionManager;

use crate::error::StateError;
use crate::health::{HealthStatus, HealthStore};
use crate::quota::{QuotaStatus, QuotaStore};

/// Extend a cooldown only if the new one outlives the current TTL, then
/// bump the consecutive failure counter
const MARK_UNHEALTHY: &str = r"
local ttl = redis.call('PTTL', KEYS[1])
if ttl < tonumber(ARGV[2]) then
  redis.call('SET', KEYS[1], ARGV[1], 'PX', ARGV[2])
end
redis.call('SET', KEYS[3], ARGV[1])
return redis.call('INCR', KEYS[2])
";

/// Add units to the window counter, starting the window on first use
const INCREMENT_USAGE: &str = r"
local used = redis.call('INCRBY', KEYS[1], ARGV[1])
if redis.call('PTTL', KEYS[1]) < 0 then
  redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return used
";

/// Open a managed connection, bounded by the configured timeout
async fn connect(config: &RedisConfig) -> Result<ConnectionManager, StateError> {
    let client = redis::Client::open(config.url.as_str())
        .map_err(|e| StateError::Redis(format!("invalid Redis URL: {e}")))?;

    tokio::time::timeout(config.connect_timeout, ConnectionManager::new(client))
        .await
        .map_err(|_| StateError::Timeout)?
        .map_err(|e| StateError::Redis(format!("failed to connect to Redis: {e}")))
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Redis-backed health store shared by every gateway instance
///
/// Reads fail open: if Redis is unreachable the backend is treated as
/// healthy and failover handles any real outage.
#[derive(Clone)]
pub struct RedisHealthStore {
    conn: ConnectionManager,
    prefix: String,
    mark_unhealthy: Script,
}

impl RedisHealthStore {
    /// Connect using the given Redis settings
    pub async fn connect(config: &RedisConfig) -> Result<Self, StateError> {
        Ok(Self {
            conn: connect(config).await?,
            prefix: config.key_prefix.clone(),
            mark_unhealthy: Script::new(MARK_UNHEALTHY),
        })
    }

    fn keys(&self, backend: &str) -> [String; 3] {
        let base = format!("{}:health:{backend}", self.prefix);
        [
            format!("{base}:cooldown"),
            format!("{base}:failures"),
            format!("{base}:reason"),
        ]
    }
}

#[async_trait]
impl HealthStore for RedisHealthStore {
    async fn is_healthy(&self, backend: &str) -> bool {
        let [cooldown, _, _] = self.keys(backend);
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<bool> = redis::cmd("EXISTS").arg(&cooldown).query_async(&mut conn).await;
        match result {
            Ok(cooling_down) => !cooling_down,
            Err(e) => {
                tracing::warn!(backend, error = %e, "health lookup failed, assuming healthy");
                true
            }
        }
    }

    async fn mark_unhealthy(&self, backend: &str, reason: &str, cooldown: Duration) {
        let [cooldown_key, failures_key, reason_key] = self.keys(backend);
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<u32> = self
            .mark_unhealthy
            .key(&cooldown_key)
            .key(&failures_key)
            .key(&reason_key)
            .arg(reason)
            .arg(millis(cooldown))
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok(failures) => tracing::warn!(
                backend,
                reason,
                cooldown_ms = millis(cooldown),
                consecutive_failures = failures,
                "backend marked unhealthy"
            ),
            Err(e) => tracing::error!(backend, error = %e, "failed to record backend failure"),
        }
    }

    async fn mark_healthy(&self, backend: &str) {
        let [cooldown, failures, reason] = self.keys(backend);
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<u32> = redis::cmd("DEL")
            .arg(&cooldown)
            .arg(&failures)
            .arg(&reason)
            .query_async(&mut conn)
            .await;

        if let Err(e) = result {
            tracing::error!(backend, error = %e, "failed to record backend recovery");
        }
    }

    async fn status(&self, backend: &str) -> HealthStatus {
        let [cooldown, failures, reason] = self.keys(backend);
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<(i64, Option<u32>, Option<String>)> = redis::pipe()
            .cmd("PTTL")
            .arg(&cooldown)
            .cmd("GET")
            .arg(&failures)
            .cmd("GET")
            .arg(&reason)
            .query_async(&mut conn)
            .await;

        match result {
            Ok((ttl_ms, failures, last_failure)) => {
                let cooldown_until = u64::try_from(ttl_ms)
                    .ok()
                    .map(|ms| SystemTime::now() + Duration::from_millis(ms));

                HealthStatus {
                    healthy: cooldown_until.is_none(),
                    cooldown_until,
                    consecutive_failures: failures.unwrap_or(0),
                    last_failure,
                }
            }
            Err(e) => {
                tracing::warn!(backend, error = %e, "health status lookup failed");
                HealthStatus {
                    healthy: true,
                    ..HealthStatus::default()
                }
            }
        }
    }
}

/// Redis-backed fixed-window quota store shared by every gateway instance
///
/// Each window is a counter key whose TTL is the time until reset.
#[derive(Clone)]
pub struct RedisQuotaStore {
    conn: ConnectionManager,
    prefix: String,
    limits: HashMap<String, u64>,
    window: Duration,
    increment: Script,
}

impl RedisQuotaStore {
    /// Connect using the given Redis settings
    pub async fn connect(
        config: &RedisConfig,
        limits: HashMap<String, u64>,
        window: Duration,
    ) -> Result<Self, StateError> {
        if window.is_zero() {
            return Err(StateError::Config("quota window must be > 0".to_owned()));
        }

        Ok(Self {
            conn: connect(config).await?,
            prefix: config.key_prefix.clone(),
            limits,
            window,
            increment: Script::new(INCREMENT_USAGE),
        })
    }

    fn key(&self, backend: &str) -> String {
        format!("{}:quota:{backend}", self.prefix)
    }
}

#[async_trait]
impl QuotaStore for RedisQuotaStore {
    async fn has_remaining_quota(&self, backend: &str) -> bool {
        let Some(limit) = self.limits.get(backend).copied() else {
            return true;
        };
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<Option<u64>> = redis::cmd("GET").arg(self.key(backend)).query_async(&mut conn).await;
        match result {
            Ok(used) => used.unwrap_or(0) < limit,
            Err(e) => {
                tracing::warn!(backend, error = %e, "quota lookup failed, assuming quota remains");
                true
            }
        }
    }

    async fn increment_usage(&self, backend: &str, units: u64) {
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<u64> = self
            .increment
            .key(self.key(backend))
            .arg(units)
            .arg(millis(self.window))
            .invoke_async(&mut conn)
            .await;

        match result {
            Ok(used) => tracing::debug!(backend, units, used, "quota usage recorded"),
            Err(e) => tracing::error!(backend, units, error = %e, "failed to record quota usage"),
        }
    }

    async fn quota_status(&self, backend: &str) -> QuotaStatus {
        let key = self.key(backend);
        let limit = self.limits.get(backend).copied();
        let mut conn = self.conn.clone();

        let result: redis::RedisResult<(Option<u64>, i64)> = redis::pipe()
            .cmd("GET")
            .arg(&key)
            .cmd("PTTL")
            .arg(&key)
            .query_async(&mut conn)
            .await;

        match result {
            Ok((used, ttl_ms)) => QuotaStatus {
                used: used.unwrap_or(0),
                limit,
                reset_in: u64::try_from(ttl_ms).map_or(self.window, Duration::from_millis),
            },
            Err(e) => {
                tracing::warn!(backend, error = %e, "quota status lookup failed");
                QuotaStatus {
                    used: 0,
                    limit,
                    reset_in: self.window,
                }
            }
        }
    }
}
