//! Programmatic configuration builder for integration tests

use std::time::Duration;

use conduit_config::{Config, ModelOfferingConfig, ProviderConfig, QuotaUnit, TenantConfig, TranslatorsConfig};

/// Model every default offering serves
pub const MODEL: &str = "gpt-x";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Empty catalog with short backoff
    pub fn new() -> Self {
        let mut config = Config::default();
        config.failover.base_delay = Duration::from_millis(10);
        config.failover.max_delay = Duration::from_millis(100);
        Self { config }
    }

    /// Add a free backend offering [`MODEL`]
    pub fn with_free(self, name: &str) -> Self {
        self.with_offering(name, true, ModelOfferingConfig::new(MODEL))
    }

    /// Add a paid backend offering [`MODEL`] at `cost`
    pub fn with_paid(self, name: &str, cost: f64) -> Self {
        let mut offering = ModelOfferingConfig::new(MODEL);
        offering.cost_per_unit = cost;
        self.with_offering(name, false, offering)
    }

    /// Add an offering to a backend, creating the backend if needed
    pub fn with_offering(mut self, name: &str, free: bool, offering: ModelOfferingConfig) -> Self {
        let provider = self
            .config
            .providers
            .entry(name.to_owned())
            .or_insert_with(|| ProviderConfig {
                free,
                ..ProviderConfig::default()
            });
        provider.models.push(offering);
        self
    }

    /// Set a backend's quota limit
    pub fn with_quota(mut self, name: &str, limit: u64) -> Self {
        if let Some(provider) = self.config.providers.get_mut(name) {
            provider.quota = Some(limit);
        }
        self
    }

    /// Charge quota in tokens instead of requests
    pub fn with_token_quota(mut self) -> Self {
        self.config.quota.unit = QuotaUnit::Tokens;
        self
    }

    /// Set the attempt bound
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.config.failover.max_attempts = attempts;
        self
    }

    /// Set the base and max backoff
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.config.failover.base_delay = base;
        self.config.failover.max_delay = max;
        self
    }

    /// Set translators
    pub fn with_translators(mut self, translators: TranslatorsConfig) -> Self {
        self.config.translators = translators;
        self
    }

    /// Add a tenant policy
    pub fn with_tenant(mut self, name: &str, tenant: TenantConfig) -> Self {
        self.config.tenants.insert(name.to_owned(), tenant);
        self
    }

    /// Build the final config, validating it like the loader does
    pub fn build(self) -> Config {
        self.config.validate().expect("test config is valid");
        self.config
    }
}
