//! Backend catalog built from configuration
//!
//! Flattens `[providers.*]` into one list of model offerings, keeping
//! declaration order: it is the tie-breaker for every routing tier.

use conduit_config::{CapabilitiesConfig, Config};
use conduit_core::EndpointKind;

/// A single model served by a single backend
#[derive(Debug, Clone, PartialEq)]
pub struct Offering {
    /// Backend id (the `[providers.<id>]` key)
    pub backend: String,
    /// Model id clients ask for
    pub model: String,
    /// Model name sent upstream
    pub upstream: String,
    /// Additional ids that resolve to this offering
    pub aliases: Vec<String>,
    /// Endpoint kinds served
    pub endpoints: Vec<EndpointKind>,
    /// Effective cost per unit, used only for ordering
    pub cost_per_unit: f64,
    /// Whether this offering is free of charge
    pub free: bool,
    /// Advertised features
    pub capabilities: CapabilitiesConfig,
}

impl Offering {
    /// Whether `model` names this offering by id or alias
    pub fn serves_model(&self, model: &str) -> bool {
        self.model == model || self.aliases.iter().any(|alias| alias == model)
    }

    /// Whether this offering serves the endpoint kind
    pub fn serves_endpoint(&self, endpoint: EndpointKind) -> bool {
        self.endpoints.contains(&endpoint)
    }
}

/// Every offering known to the gateway, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    backends: Vec<String>,
    offerings: Vec<Offering>,
}

impl Catalog {
    /// Build the catalog from configuration
    pub fn from_config(config: &Config) -> Self {
        let backends = config.providers.keys().cloned().collect();

        let offerings = config
            .providers
            .iter()
            .flat_map(|(backend, provider)| {
                provider.models.iter().map(move |model| Offering {
                    backend: backend.clone(),
                    model: model.id.clone(),
                    upstream: model.upstream.clone().unwrap_or_else(|| model.id.clone()),
                    aliases: model.aliases.clone(),
                    endpoints: model.endpoints.clone(),
                    cost_per_unit: model.cost_per_unit,
                    free: model.free.unwrap_or(provider.free),
                    capabilities: model.capabilities,
                })
            })
            .collect();

        Self { backends, offerings }
    }

    /// Backend ids in declaration order
    pub fn backends(&self) -> &[String] {
        &self.backends
    }

    /// All offerings in declaration order
    pub fn offerings(&self) -> &[Offering] {
        &self.offerings
    }

    /// Whether a backend with this id is configured
    pub fn contains_backend(&self, backend: &str) -> bool {
        self.backends.iter().any(|b| b == backend)
    }

    /// Offerings serving `model` by id or alias, in declaration order
    pub fn offerings_for<'a>(&'a self, model: &'a str) -> impl Iterator<Item = &'a Offering> + 'a {
        self.offerings.iter().filter(move |offering| offering.serves_model(model))
    }

    /// Split `backend/model` into its parts when the prefix is a known backend
    ///
    /// Model ids may legitimately contain '/', so an unknown prefix is left
    /// alone and the whole string is treated as the model id.
    pub fn split_qualified<'a>(&self, model: &'a str) -> (Option<&'a str>, &'a str) {
        match model.split_once('/') {
            Some((backend, rest)) if !rest.is_empty() && self.contains_backend(backend) => (Some(backend), rest),
            _ => (None, model),
        }
    }
}

#[cfg(test)]
mod tests {
    use conduit_config::{ModelOfferingConfig, ProviderConfig};

    use super::*;

    fn config() -> Config {
        let mut config = Config::default();

        let mut free = ModelOfferingConfig::new("gpt-x");
        free.aliases = vec!["x".to_owned()];
        config.providers.insert(
            "groq".to_owned(),
            ProviderConfig {
                free: true,
                quota: Some(10),
                models: vec![free],
            },
        );

        let mut paid = ModelOfferingConfig::new("gpt-x");
        paid.upstream = Some("gpt-x-2025-01".to_owned());
        paid.cost_per_unit = 1.5;
        let mut paid_free_override = ModelOfferingConfig::new("meta/llama");
        paid_free_override.free = Some(true);
        config.providers.insert(
            "openai".to_owned(),
            ProviderConfig {
                free: false,
                quota: None,
                models: vec![paid, paid_free_override],
            },
        );

        config
    }

    #[test]
    fn parsed_config_keeps_backend_order() {
        let config = Config::parse(
            r#"
            [[providers.b.models]]
            id = "gpt-x"

            [[providers.a.models]]
            id = "gpt-x"
            "#,
        )
        .unwrap();

        assert_eq!(Catalog::from_config(&config).backends(), ["b", "a"]);
    }

    #[test]
    fn offerings_compare_by_value() {
        let catalog = Catalog::from_config(&config());
        let rebuilt = Catalog::from_config(&config());

        assert_eq!(catalog.offerings(), rebuilt.offerings());
        assert_ne!(catalog.offerings()[0], catalog.offerings()[1]);
    }

    #[test]
    fn flattens_in_declaration_order() {
        let catalog = Catalog::from_config(&config());

        assert_eq!(catalog.backends(), ["groq", "openai"]);
        let ids: Vec<_> = catalog
            .offerings()
            .iter()
            .map(|o| (o.backend.as_str(), o.model.as_str()))
            .collect();
        assert_eq!(ids, [("groq", "gpt-x"), ("openai", "gpt-x"), ("openai", "meta/llama")]);
    }

    #[test]
    fn upstream_defaults_to_id() {
        let catalog = Catalog::from_config(&config());
        let upstreams: Vec<_> = catalog.offerings_for("gpt-x").map(|o| o.upstream.as_str()).collect();
        assert_eq!(upstreams, ["gpt-x", "gpt-x-2025-01"]);
    }

    #[test]
    fn model_free_flag_overrides_provider() {
        let catalog = Catalog::from_config(&config());
        let llama = catalog.offerings_for("meta/llama").next().unwrap();
        assert!(llama.free);
        let paid = catalog.offerings_for("gpt-x").nth(1).unwrap();
        assert!(!paid.free);
    }

    #[test]
    fn aliases_resolve() {
        let catalog = Catalog::from_config(&config());
        let backends: Vec<_> = catalog.offerings_for("x").map(|o| o.backend.as_str()).collect();
        assert_eq!(backends, ["groq"]);
    }

    #[test]
    fn qualified_model_split_only_for_known_backends() {
        let catalog = Catalog::from_config(&config());

        assert_eq!(catalog.split_qualified("openai/gpt-x"), (Some("openai"), "gpt-x"));
        assert_eq!(catalog.split_qualified("meta/llama"), (None, "meta/llama"));
        assert_eq!(catalog.split_qualified("gpt-x"), (None, "gpt-x"));
        assert_eq!(catalog.split_qualified("openai/"), (None, "openai/"));
    }
}
