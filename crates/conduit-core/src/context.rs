use tokio_util::sync::CancellationToken;

/// Per-request context threaded from the transport through the core
///
/// Carries tenant identity, routing hints, and the cancellation signal that
/// aborts in-flight backend calls, stream iteration, and backoff waits.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for log correlation
    pub request_id: String,
    /// Tenant the request is billed to, if known
    pub tenant_id: Option<String>,
    /// Backend the caller asked for, if any
    pub preferred_backend: Option<String>,
    /// Cancellation signal owned by the transport
    pub cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a context with a fresh request id and no tenant or preference
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            tenant_id: None,
            preferred_backend: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach a tenant id
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Attach a preferred backend
    #[must_use]
    pub fn with_preferred_backend(mut self, backend: impl Into<String>) -> Self {
        self.preferred_backend = Some(backend.into());
        self
    }

    /// Use an externally owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Whether the transport has cancelled this request
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_no_tenant() {
        let ctx = RequestContext::new();
        assert!(ctx.tenant_id.is_none());
        assert!(ctx.preferred_backend.is_none());
        assert!(!ctx.is_cancelled());
        assert!(!ctx.request_id.is_empty());
    }

    #[test]
    fn shared_token_cancels_context() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_tenant("acme").with_cancellation(token.clone());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.tenant_id.as_deref(), Some("acme"));
    }
}
