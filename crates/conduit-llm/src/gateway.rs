//! Failover orchestration over resolved backends
//!
//! A logical request is validated and translated once, then resolved and
//! dispatched up to `failover.max_attempts` times. Each attempt resolves
//! afresh with every previously attempted backend excluded, so a backend is
//! never tried twice for the same request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use conduit_config::{Config, FailoverConfig, QuotaUnit};
use conduit_core::RequestContext;
use conduit_routing::{Candidate, ResolutionQuery, Resolver};
use conduit_state::{HealthStore, QuotaStore};
use conduit_telemetry::metrics::GatewayMetrics;
use tokio_util::sync::CancellationToken;

use crate::backend::Backend;
use crate::error::{AttemptError, BackendError, LlmError};
use crate::failover::BackoffPolicy;
use crate::pipeline::{TranslationPipeline, validate_request};
use crate::stream::{EventStream, StreamState};
use crate::types::{CanonicalRequest, CanonicalResponse, ExecutionMode};

/// Entry point for canonical requests
///
/// Cheap to clone; clones share backends, stores, and translator chains.
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    resolver: Resolver,
    backends: HashMap<String, Arc<dyn Backend>>,
    pipeline: Arc<TranslationPipeline>,
    health: Arc<dyn HealthStore>,
    quota: Arc<dyn QuotaStore>,
    failover: FailoverConfig,
    backoff: BackoffPolicy,
    quota_unit: QuotaUnit,
    normalize_streams: bool,
    metrics: GatewayMetrics,
}

impl Gateway {
    /// Start building a gateway for `config`
    pub fn builder(config: Config) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    /// Resolver used for every attempt
    pub fn resolver(&self) -> &Resolver {
        &self.inner.resolver
    }

    /// Health collaborator
    pub fn health(&self) -> &Arc<dyn HealthStore> {
        &self.inner.health
    }

    /// Quota collaborator
    pub fn quota(&self) -> &Arc<dyn QuotaStore> {
        &self.inner.quota
    }

    /// Serve a unary request with failover
    pub async fn complete(
        &self,
        request: CanonicalRequest,
        context: &RequestContext,
    ) -> Result<CanonicalResponse, LlmError> {
        let request = self.prepare(request)?;

        let (candidate, mut response) = self
            .dispatch_with_failover(&request, ExecutionMode::Unary, context, |backend, request, cancel| async move {
                backend.complete(&request, &cancel).await
            })
            .await?;

        let units = match self.inner.quota_unit {
            QuotaUnit::Requests => 1,
            QuotaUnit::Tokens => response.usage.map_or(0, |usage| u64::from(usage.total_tokens)),
        };
        if units > 0 {
            self.inner.quota.increment_usage(&candidate.backend, units).await;
        }

        response.backend = Some(candidate.backend);
        if response.model.is_none() {
            response.model = Some(candidate.model);
        }

        Ok(self.inner.pipeline.translate_response(response))
    }

    /// Open a stream with failover
    ///
    /// Only establishing the stream is retried. Once the stream is returned,
    /// an upstream error arrives as a terminal `Err` item.
    pub async fn complete_stream(
        &self,
        request: CanonicalRequest,
        context: &RequestContext,
    ) -> Result<EventStream, LlmError> {
        let request = self.prepare(request)?;

        let (candidate, upstream) = self
            .dispatch_with_failover(
                &request,
                ExecutionMode::Streaming,
                context,
                |backend, request, cancel| async move { backend.complete_stream(&request, &cancel).await },
            )
            .await?;

        let token_quota = match self.inner.quota_unit {
            QuotaUnit::Requests => {
                self.inner.quota.increment_usage(&candidate.backend, 1).await;
                None
            }
            QuotaUnit::Tokens => Some(Arc::clone(&self.inner.quota)),
        };

        let state = StreamState::new(
            upstream,
            candidate.backend,
            Arc::clone(&self.inner.pipeline),
            self.inner.normalize_streams,
            token_quota,
            context.cancellation.clone(),
        );

        Ok(state.into_stream())
    }

    fn prepare(&self, request: CanonicalRequest) -> Result<CanonicalRequest, LlmError> {
        validate_request(&request)?;
        Ok(self.inner.pipeline.translate_request(request))
    }

    async fn dispatch_with_failover<T, F, Fut>(
        &self,
        request: &CanonicalRequest,
        mode: ExecutionMode,
        context: &RequestContext,
        dispatch: F,
    ) -> Result<(Candidate, T), LlmError>
    where
        F: Fn(Arc<dyn Backend>, CanonicalRequest, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let inner = &self.inner;
        let capabilities = request.required_capabilities(mode);
        let mut attempted: Vec<String> = Vec::new();
        let mut failures: Vec<AttemptError> = Vec::new();

        for attempt in 0..inner.failover.max_attempts {
            if context.is_cancelled() {
                tracing::debug!(request_id = %context.request_id, attempt, "cancelled before attempt");
                return Err(LlmError::Canceled);
            }

            let query = ResolutionQuery::new(&request.model, request.endpoint, capabilities)
                .tenant(context.tenant_id.as_deref())
                .prefer(context.preferred_backend.as_deref())
                .excluding(&attempted);

            let resolution = match inner.resolver.resolve(&query).await {
                Ok(resolution) => resolution,
                Err(error) if attempt == 0 => return Err(error.into()),
                Err(_) => {
                    tracing::warn!(
                        request_id = %context.request_id,
                        attempt,
                        model = %request.model,
                        "no untried candidate left"
                    );
                    break;
                }
            };
            inner.metrics.record_resolution(&resolution.tier.to_string());

            let candidate = resolution.winner;
            let Some(backend) = inner.backends.get(&candidate.backend).cloned() else {
                return Err(LlmError::Internal(anyhow::anyhow!(
                    "backend '{}' has no registered implementation",
                    candidate.backend
                )));
            };
            attempted.push(candidate.backend.clone());

            let mut upstream = request.clone();
            upstream.model.clone_from(&candidate.model);

            tracing::debug!(
                request_id = %context.request_id,
                tenant = context.tenant_id.as_deref().unwrap_or_default(),
                attempt,
                backend = %candidate.backend,
                model = %candidate.model,
                tier = %resolution.tier,
                "dispatching"
            );

            let start = Instant::now();
            let outcome = tokio::select! {
                biased;
                () = context.cancellation.cancelled() => {
                    inner.metrics.record_dispatch(&candidate.backend, "canceled", start);
                    return Err(LlmError::Canceled);
                }
                outcome = dispatch(backend, upstream, context.cancellation.clone()) => outcome,
            };

            let error = match outcome {
                Ok(value) => {
                    inner.metrics.record_dispatch(&candidate.backend, "success", start);
                    inner.health.mark_healthy(&candidate.backend).await;
                    tracing::debug!(attempt, backend = %candidate.backend, "dispatch succeeded");
                    return Ok((candidate, value));
                }
                Err(error) if !error.is_retryable() => {
                    inner.metrics.record_dispatch(&candidate.backend, "fatal", start);
                    tracing::warn!(
                        attempt,
                        backend = %candidate.backend,
                        model = %candidate.model,
                        error = %error,
                        "non-retryable backend failure"
                    );
                    return Err(LlmError::Backend(error));
                }
                Err(error) => error,
            };

            inner.metrics.record_dispatch(&candidate.backend, "retryable", start);
            tracing::warn!(
                attempt,
                backend = %candidate.backend,
                model = %candidate.model,
                error = %error,
                "backend failed, failing over"
            );

            if inner.failover.mark_unhealthy {
                inner
                    .health
                    .mark_unhealthy(&candidate.backend, &error.to_string(), inner.failover.cooldown)
                    .await;
            }

            failures.push(AttemptError {
                attempt,
                model: candidate.model,
                error,
            });

            if attempt + 1 < inner.failover.max_attempts {
                let delay = inner.backoff.delay(attempt);
                tokio::select! {
                    biased;
                    () = context.cancellation.cancelled() => {
                        tracing::debug!(request_id = %context.request_id, attempt, "cancelled during backoff");
                        return Err(LlmError::Canceled);
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }

        inner.metrics.record_exhausted(failures.len());
        tracing::error!(
            request_id = %context.request_id,
            model = %request.model,
            attempts = failures.len(),
            "failover exhausted"
        );

        Err(LlmError::FailoverExhausted { attempts: failures })
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut backends: Vec<_> = self.inner.backends.keys().collect();
        backends.sort();

        f.debug_struct("Gateway")
            .field("backends", &backends)
            .field("pipeline", &self.inner.pipeline)
            .field("max_attempts", &self.inner.failover.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Gateway`] from configuration and backend implementations
pub struct GatewayBuilder {
    config: Config,
    backends: HashMap<String, Arc<dyn Backend>>,
    health: Option<Arc<dyn HealthStore>>,
    quota: Option<Arc<dyn QuotaStore>>,
    pipeline: Option<TranslationPipeline>,
}

impl GatewayBuilder {
    /// Builder for `config` with no backends registered
    pub fn new(config: Config) -> Self {
        Self {
            config,
            backends: HashMap::new(),
            health: None,
            quota: None,
            pipeline: None,
        }
    }

    /// Register the implementation for a configured provider
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.insert(backend.id().to_owned(), backend);
        self
    }

    /// Use an existing health store instead of the configured one
    #[must_use]
    pub fn health_store(mut self, store: Arc<dyn HealthStore>) -> Self {
        self.health = Some(store);
        self
    }

    /// Use an existing quota store instead of the configured one
    #[must_use]
    pub fn quota_store(mut self, store: Arc<dyn QuotaStore>) -> Self {
        self.quota = Some(store);
        self
    }

    /// Use a custom pipeline instead of the configured translators
    #[must_use]
    pub fn pipeline(mut self, pipeline: TranslationPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Build the gateway
    ///
    /// Fails when a configured provider has no registered backend, or when a
    /// configured state store cannot be reached.
    pub async fn build(self) -> anyhow::Result<Gateway> {
        let health = match self.health {
            Some(store) => store,
            None => conduit_state::create_health_store(&self.config).await?,
        };
        let quota = match self.quota {
            Some(store) => store,
            None => conduit_state::create_quota_store(&self.config).await?,
        };
        let pipeline = match self.pipeline {
            Some(pipeline) => pipeline,
            None => TranslationPipeline::from_config(&self.config.translators)?,
        };

        let resolver = Resolver::from_config(&self.config, Arc::clone(&health), Arc::clone(&quota));

        if let Some(missing) = resolver
            .catalog()
            .backends()
            .iter()
            .find(|id| !self.backends.contains_key(*id))
        {
            anyhow::bail!("provider '{missing}' has no registered backend");
        }
        for id in self.backends.keys() {
            if !resolver.catalog().contains_backend(id) {
                tracing::warn!(backend = %id, "registered backend is not configured and will never be used");
            }
        }

        tracing::info!(
            backends = self.backends.len(),
            offerings = resolver.catalog().offerings().len(),
            max_attempts = self.config.failover.max_attempts,
            "gateway ready"
        );

        Ok(Gateway {
            inner: Arc::new(GatewayInner {
                resolver,
                backends: self.backends,
                pipeline: Arc::new(pipeline),
                health,
                quota,
                backoff: BackoffPolicy::from_config(&self.config.failover),
                failover: self.config.failover,
                quota_unit: self.config.quota.unit,
                normalize_streams: self.config.normalize.stream_tool_call_ids,
                metrics: GatewayMetrics::new(),
            }),
        })
    }
}
