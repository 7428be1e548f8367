use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::health::{HealthStatus, HealthStore};
use crate::quota::{QuotaStatus, QuotaStore};

/// Per-backend health record
#[derive(Debug, Default)]
struct BackendHealth {
    cooldown_until: Option<Instant>,
    consecutive_failures: u32,
    last_failure: Option<String>,
}

impl BackendHealth {
    fn cooling_down(&self, now: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| now < until)
    }
}

/// In-process health store (single instance only)
///
/// Each backend's record is updated under its `DashMap` shard lock, so a
/// concurrent shorter cooldown can never truncate a longer one.
#[derive(Debug, Default)]
pub struct MemoryHealthStore {
    backends: DashMap<String, BackendHealth>,
}

impl MemoryHealthStore {
    /// Create an empty store where every backend starts healthy
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HealthStore for MemoryHealthStore {
    async fn is_healthy(&self, backend: &str) -> bool {
        self.backends
            .get(backend)
            .is_none_or(|health| !health.cooling_down(Instant::now()))
    }

    async fn mark_unhealthy(&self, backend: &str, reason: &str, cooldown: Duration) {
        let now = Instant::now();
        let mut health = self.backends.entry(backend.to_owned()).or_default();

        let until = now + cooldown;
        if health.cooldown_until.is_none_or(|current| current < until) {
            health.cooldown_until = Some(until);
        }
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.last_failure = Some(reason.to_owned());

        let failures = health.consecutive_failures;
        drop(health);

        tracing::warn!(
            backend,
            reason,
            cooldown_ms = cooldown.as_millis(),
            consecutive_failures = failures,
            "backend marked unhealthy"
        );
    }

    async fn mark_healthy(&self, backend: &str) {
        if let Some((_, previous)) = self.backends.remove(backend)
            && previous.consecutive_failures > 0
        {
            tracing::info!(backend, "backend recovered");
        }
    }

    async fn status(&self, backend: &str) -> HealthStatus {
        let Some(health) = self.backends.get(backend) else {
            return HealthStatus {
                healthy: true,
                ..HealthStatus::default()
            };
        };

        let now = Instant::now();
        let cooldown_until = health
            .cooldown_until
            .filter(|until| *until > now)
            .map(|until| SystemTime::now() + (until - now));

        HealthStatus {
            healthy: cooldown_until.is_none(),
            cooldown_until,
            consecutive_failures: health.consecutive_failures,
            last_failure: health.last_failure.clone(),
        }
    }
}

/// Usage inside one fixed window
#[derive(Debug)]
struct UsageWindow {
    started: Instant,
    used: u64,
}

impl UsageWindow {
    fn new(now: Instant) -> Self {
        Self { started: now, used: 0 }
    }

    fn roll(&mut self, now: Instant, window: Duration) {
        if now.duration_since(self.started) >= window {
            self.started = now;
            self.used = 0;
        }
    }
}

/// In-process fixed-window quota store (single instance only)
#[derive(Debug)]
pub struct MemoryQuotaStore {
    limits: HashMap<String, u64>,
    window: Duration,
    usage: DashMap<String, UsageWindow>,
}

impl MemoryQuotaStore {
    /// Create a store with per-backend limits; unlisted backends are unlimited
    pub fn new(limits: HashMap<String, u64>, window: Duration) -> Self {
        Self {
            limits,
            window,
            usage: DashMap::new(),
        }
    }

    fn current_usage(&self, backend: &str, now: Instant) -> (u64, Duration) {
        self.usage.get(backend).map_or((0, self.window), |usage| {
            let elapsed = now.duration_since(usage.started);
            if elapsed >= self.window {
                (0, self.window)
            } else {
                (usage.used, self.window - elapsed)
            }
        })
    }
}

#[async_trait]
impl QuotaStore for MemoryQuotaStore {
    async fn has_remaining_quota(&self, backend: &str) -> bool {
        let Some(limit) = self.limits.get(backend) else {
            return true;
        };
        let (used, _) = self.current_usage(backend, Instant::now());
        used < *limit
    }

    async fn increment_usage(&self, backend: &str, units: u64) {
        let now = Instant::now();
        let mut usage = self
            .usage
            .entry(backend.to_owned())
            .or_insert_with(|| UsageWindow::new(now));

        usage.roll(now, self.window);
        usage.used = usage.used.saturating_add(units);
    }

    async fn quota_status(&self, backend: &str) -> QuotaStatus {
        let (used, reset_in) = self.current_usage(backend, Instant::now());
        QuotaStatus {
            used,
            limit: self.limits.get(backend).copied(),
            reset_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_backend_is_healthy() {
        let store = MemoryHealthStore::new();
        assert!(store.is_healthy("fresh").await);
        let status = store.status("fresh").await;
        assert!(status.healthy);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn cooldown_makes_backend_unhealthy() {
        let store = MemoryHealthStore::new();
        store.mark_unhealthy("groq", "timeout", Duration::from_secs(60)).await;

        assert!(!store.is_healthy("groq").await);
        let status = store.status("groq").await;
        assert!(!status.healthy);
        assert!(status.cooldown_until.is_some());
        assert_eq!(status.consecutive_failures, 1);
        assert_eq!(status.last_failure.as_deref(), Some("timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_expires() {
        let store = MemoryHealthStore::new();
        store.mark_unhealthy("groq", "timeout", Duration::from_millis(1)).await;
        tokio::time::advance(Duration::from_millis(10)).await;

        assert!(store.is_healthy("groq").await);
        // failures are remembered until an explicit recovery
        assert_eq!(store.status("groq").await.consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_cooldown_does_not_shorten_existing() {
        let store = MemoryHealthStore::new();
        store.mark_unhealthy("groq", "server error", Duration::from_secs(60)).await;
        store.mark_unhealthy("groq", "timeout", Duration::from_millis(1)).await;
        tokio::time::advance(Duration::from_millis(10)).await;

        assert!(!store.is_healthy("groq").await);
        assert_eq!(store.status("groq").await.consecutive_failures, 2);
    }

    #[tokio::test]
    async fn mark_healthy_clears_cooldown() {
        let store = MemoryHealthStore::new();
        store.mark_unhealthy("groq", "timeout", Duration::from_secs(60)).await;
        store.mark_healthy("groq").await;

        assert!(store.is_healthy("groq").await);
        assert_eq!(store.status("groq").await, HealthStatus {
            healthy: true,
            ..HealthStatus::default()
        });
    }

    #[tokio::test]
    async fn independent_backend_tracking() {
        let store = MemoryHealthStore::new();
        store.mark_unhealthy("bad", "boom", Duration::from_secs(60)).await;
        assert!(!store.is_healthy("bad").await);
        assert!(store.is_healthy("good").await);
    }

    fn quota_store(limit: u64, window: Duration) -> MemoryQuotaStore {
        MemoryQuotaStore::new(HashMap::from([("free".to_owned(), limit)]), window)
    }

    #[tokio::test]
    async fn unlimited_backend_always_has_quota() {
        let store = quota_store(1, Duration::from_secs(60));
        store.increment_usage("paid", 1_000).await;
        assert!(store.has_remaining_quota("paid").await);
        assert_eq!(store.quota_status("paid").await.limit, None);
    }

    #[tokio::test]
    async fn usage_exhausts_quota() {
        let store = quota_store(3, Duration::from_secs(60));
        store.increment_usage("free", 2).await;
        assert!(store.has_remaining_quota("free").await);

        store.increment_usage("free", 1).await;
        assert!(!store.has_remaining_quota("free").await);

        let status = store.quota_status("free").await;
        assert_eq!(status.used, 3);
        assert_eq!(status.limit, Some(3));
        assert!(status.reset_in <= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn window_reset_restores_quota() {
        let store = quota_store(1, Duration::from_millis(5));
        store.increment_usage("free", 1).await;
        assert!(!store.has_remaining_quota("free").await);

        tokio::time::advance(Duration::from_millis(10)).await;
        assert!(store.has_remaining_quota("free").await);

        store.increment_usage("free", 1).await;
        assert_eq!(store.quota_status("free").await.used, 1);
    }
}
