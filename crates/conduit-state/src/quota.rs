use std::time::Duration;

use async_trait::async_trait;

/// Point-in-time quota facts for one backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuotaStatus {
    /// Units consumed in the current window
    pub used: u64,
    /// Units allowed per window (`None` means unlimited)
    pub limit: Option<u64>,
    /// Time until the window resets
    pub reset_in: Duration,
}

impl QuotaStatus {
    /// Units left in the current window (`None` means unlimited)
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    /// Whether at least one unit remains
    pub fn has_remaining(&self) -> bool {
        self.remaining().is_none_or(|left| left > 0)
    }
}

/// Quota collaborator consulted by the free and paid routing tiers
///
/// Usage accumulates in fixed windows; increments must be atomic with the
/// window's expiry so concurrent requests never lose counts.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Whether the backend has any quota left in the current window
    async fn has_remaining_quota(&self, backend: &str) -> bool;

    /// Charge `units` against the backend's current window
    async fn increment_usage(&self, backend: &str, units: u64);

    /// Full quota facts for operators
    async fn quota_status(&self, backend: &str) -> QuotaStatus;
}
