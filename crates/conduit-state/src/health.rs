use std::time::{Duration, SystemTime};

use async_trait::async_trait;

/// Point-in-time health facts for one backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthStatus {
    /// Whether the backend may receive traffic
    pub healthy: bool,
    /// When the current cooldown ends, if one is active
    pub cooldown_until: Option<SystemTime>,
    /// Failures reported since the last recovery
    pub consecutive_failures: u32,
    /// Reason given with the most recent failure report
    pub last_failure: Option<String>,
}

/// Health collaborator consulted on every resolution
///
/// While a backend is cooling down `is_healthy` returns false until the
/// cooldown expires or `mark_healthy` is called. Implementations must make
/// `mark_unhealthy` conditional: a shorter cooldown never replaces a longer
/// one already in force.
#[async_trait]
pub trait HealthStore: Send + Sync {
    /// Whether the backend is currently eligible for traffic
    async fn is_healthy(&self, backend: &str) -> bool;

    /// Force the backend unhealthy for at least `cooldown`
    async fn mark_unhealthy(&self, backend: &str, reason: &str, cooldown: Duration);

    /// Clear any cooldown and reset the failure count
    async fn mark_healthy(&self, backend: &str);

    /// Full health facts for operators
    async fn status(&self, backend: &str) -> HealthStatus;
}
