use std::collections::HashSet;
use std::path::Path;

use crate::{Config, TranslatorConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `${VAR}` placeholders, then deserializes and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing, or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        tracing::debug!(providers = config.providers.len(), "configuration loaded");

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error describing the first inconsistency found
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_providers()?;
        self.validate_failover()?;
        self.validate_translators()?;
        self.validate_tenants()?;
        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured");
        }

        for (name, provider) in &self.providers {
            if name.is_empty() || name.contains('/') {
                anyhow::bail!("provider id '{name}' must be non-empty and must not contain '/'");
            }

            if provider.quota == Some(0) {
                anyhow::bail!("provider '{name}' has a quota of 0; omit it for unlimited");
            }

            let mut seen = HashSet::new();
            for model in &provider.models {
                if model.id.is_empty() {
                    anyhow::bail!("provider '{name}' has a model with an empty id");
                }
                if !seen.insert(model.id.as_str()) {
                    anyhow::bail!("provider '{name}' declares model '{}' more than once", model.id);
                }
                if !model.cost_per_unit.is_finite() || model.cost_per_unit < 0.0 {
                    anyhow::bail!(
                        "model '{}' on provider '{name}' must have a finite, non-negative cost_per_unit",
                        model.id
                    );
                }
                if model.endpoints.is_empty() {
                    anyhow::bail!("model '{}' on provider '{name}' serves no endpoints", model.id);
                }
            }
        }

        Ok(())
    }

    fn validate_failover(&self) -> anyhow::Result<()> {
        let failover = &self.failover;

        if failover.max_attempts == 0 {
            anyhow::bail!("failover.max_attempts must be at least 1");
        }
        if failover.base_delay > failover.max_delay {
            anyhow::bail!("failover.base_delay must not exceed failover.max_delay");
        }
        if !(0.0..=1.0).contains(&failover.jitter) {
            anyhow::bail!("failover.jitter must be between 0.0 and 1.0");
        }
        if self.quota.window.is_zero() {
            anyhow::bail!("quota.window must be greater than zero");
        }

        Ok(())
    }

    fn validate_translators(&self) -> anyhow::Result<()> {
        fn check<A>(axis: &str, translators: &[TranslatorConfig<A>]) -> anyhow::Result<()> {
            for translator in translators {
                for pattern in &translator.models {
                    regex::Regex::new(pattern)
                        .map_err(|e| anyhow::anyhow!("invalid model pattern in {axis} translator: {e}"))?;
                }
            }
            Ok(())
        }

        check("request", &self.translators.request)?;
        check("response", &self.translators.response)?;
        check("chunk", &self.translators.chunk)?;

        // requests are translated before a backend is chosen
        if self.translators.request.iter().any(|t| !t.backends.is_empty()) {
            anyhow::bail!("request translators match on models only; remove `backends`");
        }
        // chunks carry no model id
        if self.translators.chunk.iter().any(|t| !t.models.is_empty()) {
            anyhow::bail!("chunk translators match on backends only; remove `models`");
        }

        for translator in &self.translators.response {
            if let Some(unknown) = translator.backends.iter().find(|b| !self.providers.contains_key(*b)) {
                anyhow::bail!("response translator references unknown provider '{unknown}'");
            }
        }
        for translator in &self.translators.chunk {
            if let Some(unknown) = translator.backends.iter().find(|b| !self.providers.contains_key(*b)) {
                anyhow::bail!("chunk translator references unknown provider '{unknown}'");
            }
        }

        Ok(())
    }

    fn validate_tenants(&self) -> anyhow::Result<()> {
        for (tenant, policy) in &self.tenants {
            let referenced = policy.preferred_backend.iter().chain(&policy.deny_backends);
            for backend in referenced {
                if !self.providers.contains_key(backend) {
                    anyhow::bail!("tenant '{tenant}' references unknown provider '{backend}'");
                }
            }
        }

        Ok(())
    }
}
