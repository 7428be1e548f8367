use conduit_core::EndpointKind;
use serde::Deserialize;

/// Configuration for a single inference backend
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Whether this backend's offerings are free of charge by default
    #[serde(default)]
    pub free: bool,
    /// Quota limit in units per quota window (absent means unlimited)
    #[serde(default)]
    pub quota: Option<u64>,
    /// Models offered by this backend, in priority order
    #[serde(default)]
    pub models: Vec<ModelOfferingConfig>,
}

/// A model served by a backend
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelOfferingConfig {
    /// Model identifier clients ask for
    pub id: String,
    /// Model name sent upstream (defaults to `id`)
    #[serde(default)]
    pub upstream: Option<String>,
    /// Additional identifiers resolving to this offering
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Endpoint kinds this offering serves
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<EndpointKind>,
    /// Effective cost per unit, used only for ordering
    #[serde(default)]
    pub cost_per_unit: f64,
    /// Override the backend-level free flag for this model
    #[serde(default)]
    pub free: Option<bool>,
    /// Feature support
    #[serde(default)]
    pub capabilities: CapabilitiesConfig,
}

impl ModelOfferingConfig {
    /// Create an offering with defaults for everything but the id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            upstream: None,
            aliases: Vec::new(),
            endpoints: default_endpoints(),
            cost_per_unit: 0.0,
            free: None,
            capabilities: CapabilitiesConfig::default(),
        }
    }
}

/// Feature flags advertised by a model offering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilitiesConfig {
    /// Supports streamed responses
    #[serde(default = "crate::default_true")]
    pub streaming: bool,
    /// Supports tool/function calling
    #[serde(default)]
    pub tools: bool,
    /// Accepts image input
    #[serde(default)]
    pub vision: bool,
    /// Accepts audio input
    #[serde(default)]
    pub audio: bool,
}

impl Default for CapabilitiesConfig {
    fn default() -> Self {
        Self {
            streaming: true,
            tools: false,
            vision: false,
            audio: false,
        }
    }
}

fn default_endpoints() -> Vec<EndpointKind> {
    vec![EndpointKind::ChatCompletions]
}
