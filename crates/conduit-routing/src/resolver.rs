//! Tiered, capability-aware backend resolution
//!
//! Candidates are filtered first (model, endpoint, capabilities, exclusions,
//! tenant policy) and then grouped into tiers evaluated in strict order:
//!
//! 1. **Preferred**: the requested backend, if healthy, is the sole candidate
//! 2. **Free**: free offerings that are healthy and have quota left
//! 3. **Paid**: the rest, healthy and with quota, cheapest first
//! 4. **Emergency**: anything healthy, quota ignored, cheapest first
//!
//! The first non-empty tier wins. Health and quota are read fresh on every
//! call, so results must never be cached across failover attempts.

use std::sync::Arc;

use conduit_config::{Config, TenantConfig};
use conduit_core::EndpointKind;
use conduit_state::{HealthStore, QuotaStore};
use futures_util::future::{join, join_all};
use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;

use crate::capabilities::RequiredCapabilities;
use crate::catalog::{Catalog, Offering};
use crate::error::RoutingError;

/// Routing tier that produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Tier {
    /// The caller's or tenant's preferred backend
    Preferred,
    /// Free offerings with quota left
    Free,
    /// Paid offerings with quota left, cheapest first
    Paid,
    /// Any healthy offering, quota ignored
    Emergency,
}

/// A resolved backend and the upstream model to ask it for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Backend id
    pub backend: String,
    /// Model name to send upstream
    pub model: String,
    /// Effective cost per unit
    pub cost_per_unit: f64,
    /// Whether the offering is free of charge
    pub free: bool,
}

impl From<&Offering> for Candidate {
    fn from(offering: &Offering) -> Self {
        Self {
            backend: offering.backend.clone(),
            model: offering.upstream.clone(),
            cost_per_unit: offering.cost_per_unit,
            free: offering.free,
        }
    }
}

/// Outcome of one resolution: the winner plus every candidate considered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionResult {
    /// Candidate to dispatch to
    pub winner: Candidate,
    /// Ranked candidates of the winning tier, winner first
    pub candidates: Vec<Candidate>,
    /// Tier the candidates came from
    pub tier: Tier,
}

/// What to resolve
#[derive(Debug, Clone, Copy)]
pub struct ResolutionQuery<'a> {
    /// Requested model id, optionally qualified as `backend/model`
    pub model: &'a str,
    /// Endpoint kind the request targets
    pub endpoint: EndpointKind,
    /// Features the backend must support
    pub capabilities: RequiredCapabilities,
    /// Tenant whose policy applies
    pub tenant: Option<&'a str>,
    /// Backend the caller prefers
    pub preferred_backend: Option<&'a str>,
    /// Backends already attempted in this logical request
    pub excluded: &'a [String],
}

impl<'a> ResolutionQuery<'a> {
    /// Query for a model with no tenant, preference, or exclusions
    pub const fn new(model: &'a str, endpoint: EndpointKind, capabilities: RequiredCapabilities) -> Self {
        Self {
            model,
            endpoint,
            capabilities,
            tenant: None,
            preferred_backend: None,
            excluded: &[],
        }
    }

    /// Apply a tenant's routing policy
    #[must_use]
    pub const fn tenant(mut self, tenant: Option<&'a str>) -> Self {
        self.tenant = tenant;
        self
    }

    /// Prefer a backend
    #[must_use]
    pub const fn prefer(mut self, backend: Option<&'a str>) -> Self {
        self.preferred_backend = backend;
        self
    }

    /// Skip backends that were already attempted
    #[must_use]
    pub const fn excluding(mut self, excluded: &'a [String]) -> Self {
        self.excluded = excluded;
        self
    }
}

/// Health and quota facts for one candidate, read once per resolution
#[derive(Debug, Clone, Copy)]
struct Facts {
    healthy: bool,
    has_quota: bool,
}

/// Resolves model requests to backends
pub struct Resolver {
    catalog: Arc<Catalog>,
    tenants: IndexMap<String, TenantConfig>,
    health: Arc<dyn HealthStore>,
    quota: Arc<dyn QuotaStore>,
}

impl Resolver {
    /// Create a resolver over a catalog and the shared state collaborators
    pub fn new(catalog: Catalog, health: Arc<dyn HealthStore>, quota: Arc<dyn QuotaStore>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            tenants: IndexMap::new(),
            health,
            quota,
        }
    }

    /// Create a resolver with the catalog and tenant policy from configuration
    pub fn from_config(config: &Config, health: Arc<dyn HealthStore>, quota: Arc<dyn QuotaStore>) -> Self {
        Self::new(Catalog::from_config(config), health, quota).with_tenants(config.tenants.clone())
    }

    /// Set per-tenant policy
    #[must_use]
    pub fn with_tenants(mut self, tenants: IndexMap<String, TenantConfig>) -> Self {
        self.tenants = tenants;
        self
    }

    /// The catalog being resolved against
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Resolve a query to a ranked candidate list
    pub async fn resolve(&self, query: &ResolutionQuery<'_>) -> Result<ResolutionResult, RoutingError> {
        let (qualified_backend, model) = self.catalog.split_qualified(query.model);
        let tenant = query.tenant.and_then(|id| self.tenants.get(id));

        let unavailable = || RoutingError::ProviderUnavailable {
            model: query.model.to_owned(),
            endpoint: query.endpoint,
        };

        let eligible = self.eligible(model, query, tenant);
        if eligible.is_empty() {
            tracing::debug!(
                model = query.model,
                endpoint = %query.endpoint,
                tenant = query.tenant,
                excluded = query.excluded.len(),
                "no offering passes the resolution filter"
            );
            return Err(unavailable());
        }

        let facts = self.facts(&eligible).await;

        let preferred = qualified_backend
            .or(query.preferred_backend)
            .or_else(|| tenant.and_then(|policy| policy.preferred_backend.as_deref()));

        let Some((tier, ranked)) = select(&eligible, &facts, preferred) else {
            tracing::warn!(
                model = query.model,
                endpoint = %query.endpoint,
                considered = eligible.len(),
                "every capable backend is unhealthy"
            );
            return Err(unavailable());
        };

        let candidates: Vec<Candidate> = ranked.into_iter().map(Candidate::from).collect();
        let winner = candidates.first().cloned().ok_or_else(unavailable)?;

        tracing::debug!(
            model = query.model,
            backend = %winner.backend,
            upstream = %winner.model,
            tier = %tier,
            candidates = candidates.len(),
            "backend resolved"
        );

        Ok(ResolutionResult {
            winner,
            candidates,
            tier,
        })
    }

    /// Offerings that could serve the query, one per backend, in declaration order
    fn eligible<'a>(
        &'a self,
        model: &'a str,
        query: &ResolutionQuery<'_>,
        tenant: Option<&TenantConfig>,
    ) -> Vec<&'a Offering> {
        let mut eligible: Vec<&Offering> = Vec::new();

        for offering in self.catalog.offerings_for(model) {
            let backend = offering.backend.as_str();

            let usable = offering.serves_endpoint(query.endpoint)
                && query.capabilities.satisfied_by(&offering.capabilities)
                && !query.excluded.iter().any(|excluded| excluded == backend)
                && !tenant.is_some_and(|policy| policy.deny_backends.iter().any(|denied| denied == backend))
                && !eligible.iter().any(|seen| seen.backend == backend);

            if usable {
                eligible.push(offering);
            }
        }

        eligible
    }

    async fn facts(&self, eligible: &[&Offering]) -> Vec<Facts> {
        join_all(eligible.iter().map(|offering| async move {
            let (healthy, has_quota) = join(
                self.health.is_healthy(&offering.backend),
                self.quota.has_remaining_quota(&offering.backend),
            )
            .await;
            Facts { healthy, has_quota }
        }))
        .await
    }
}

/// Pick the first non-empty tier
fn select<'a>(
    eligible: &[&'a Offering],
    facts: &[Facts],
    preferred: Option<&str>,
) -> Option<(Tier, Vec<&'a Offering>)> {
    let annotated = || eligible.iter().copied().zip(facts.iter().copied());

    if let Some(preferred) = preferred
        && let Some((offering, _)) = annotated().find(|(offering, facts)| offering.backend == preferred && facts.healthy)
    {
        return Some((Tier::Preferred, vec![offering]));
    }

    let free: Vec<_> = annotated()
        .filter(|(offering, facts)| offering.free && facts.healthy && facts.has_quota)
        .map(|(offering, _)| offering)
        .collect();
    if !free.is_empty() {
        return Some((Tier::Free, free));
    }

    let paid = cheapest_first(
        annotated()
            .filter(|(offering, facts)| !offering.free && facts.healthy && facts.has_quota)
            .map(|(offering, _)| offering)
            .collect(),
    );
    if !paid.is_empty() {
        return Some((Tier::Paid, paid));
    }

    let emergency = cheapest_first(
        annotated()
            .filter(|(_, facts)| facts.healthy)
            .map(|(offering, _)| offering)
            .collect(),
    );
    if !emergency.is_empty() {
        return Some((Tier::Emergency, emergency));
    }

    None
}

/// Stable sort by cost so equal costs keep declaration order
fn cheapest_first(mut offerings: Vec<&Offering>) -> Vec<&Offering> {
    offerings.sort_by(|a, b| a.cost_per_unit.total_cmp(&b.cost_per_unit));
    offerings
}
