#![allow(clippy::must_use_candidate)]

mod duration;
mod env;
pub mod failover;
mod loader;
pub mod provider;
pub mod state;
pub mod telemetry;
pub mod tenant;
pub mod translators;

use indexmap::IndexMap;
use serde::Deserialize;

pub use failover::*;
pub use provider::*;
pub use state::*;
pub use telemetry::TelemetryConfig;
pub use tenant::*;
pub use translators::*;

/// Top-level Conduit configuration
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Backend catalog keyed by backend id, in declaration order
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    /// Failover orchestration settings
    #[serde(default)]
    pub failover: FailoverConfig,
    /// Health state storage
    #[serde(default)]
    pub health: HealthConfig,
    /// Quota state storage and accounting
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Tool-call normalization settings
    #[serde(default)]
    pub normalize: NormalizeConfig,
    /// Backend-specific translators, per axis
    #[serde(default)]
    pub translators: TranslatorsConfig,
    /// Per-tenant routing policy
    #[serde(default)]
    pub tenants: IndexMap<String, TenantConfig>,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

/// Tool-call identifier normalization
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Synthesize missing tool-call ids on streams using a per-stream context
    #[serde(default = "default_true")]
    pub stream_tool_call_ids: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            stream_tool_call_ids: true,
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
pub(crate) fn default_true() -> bool {
    true
}
