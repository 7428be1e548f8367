use serde::Deserialize;

/// Routing policy for a single tenant
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantConfig {
    /// Backend tried first when the caller names none
    #[serde(default)]
    pub preferred_backend: Option<String>,
    /// Backends this tenant must never be routed to
    #[serde(default)]
    pub deny_backends: Vec<String>,
}
