use conduit_core::{EndpointKind, HttpError};
use conduit_routing::RoutingError;
use http::StatusCode;
use serde::Serialize;
use strum::Display;
use thiserror::Error;

/// Category of a backend dispatch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BackendErrorKind {
    /// Backend did not answer in time
    Timeout,
    /// Backend rejected the request for rate reasons (429)
    RateLimited,
    /// Backend returned a 5xx
    Server,
    /// Transport failure before a response arrived
    Connection,
    /// Backend reported it is over capacity
    Overloaded,
    /// Stream broke before it could be handed out
    Stream,
    /// Credentials rejected (401)
    Authentication,
    /// Credentials valid but not allowed (403)
    PermissionDenied,
    /// Backend rejected the request as malformed (400, 422)
    InvalidRequest,
    /// Model or route unknown to the backend (404)
    NotFound,
    /// Blocked by the backend's safety system
    ContentFiltered,
}

impl BackendErrorKind {
    /// Whether trying another candidate may succeed
    ///
    /// Transient conditions are retryable. Failures caused by the request
    /// itself or by credentials would fail the same way elsewhere.
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::RateLimited | Self::Server | Self::Connection | Self::Overloaded | Self::Stream
        )
    }

    /// Classify an upstream HTTP status code
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            503 | 529 => Self::Overloaded,
            400..=499 => Self::InvalidRequest,
            _ => Self::Server,
        }
    }
}

/// A failed dispatch to one backend
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("backend '{backend}' failed ({kind}): {message}")]
pub struct BackendError {
    /// Backend that failed
    pub backend: String,
    /// Failure category
    pub kind: BackendErrorKind,
    /// Upstream or transport detail
    pub message: String,
}

impl BackendError {
    /// Build an error for `backend`
    pub fn new(backend: impl Into<String>, kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            kind,
            message: message.into(),
        }
    }

    /// Build an error from an upstream HTTP status
    pub fn from_status(backend: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::new(backend, BackendErrorKind::from_status(status), message)
    }

    /// Whether trying another candidate may succeed
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// One failed attempt recorded by the failover orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("attempt {attempt}: {error}")]
pub struct AttemptError {
    /// Zero-based attempt number
    pub attempt: u32,
    /// Upstream model asked for
    pub model: String,
    /// What went wrong
    pub error: BackendError,
}

/// Malformed canonical input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Model id is empty
    #[error("model must not be empty")]
    EmptyModel,

    /// Chat request carries no messages
    #[error("messages must not be empty")]
    NoMessages,

    /// Tool message lacks the id of the call it answers
    #[error("message {index} has role 'tool' but no tool_call_id")]
    MissingToolCallId { index: usize },

    /// Option outside its accepted range
    #[error("{field} must be {range}")]
    OutOfRange { field: &'static str, range: &'static str },

    /// Declared tool has no name
    #[error("tool {index} has an empty name")]
    EmptyToolName { index: usize },

    /// Two declared tools share a name
    #[error("tool '{name}' is declared more than once")]
    DuplicateTool { name: String },
}

/// Errors surfaced to the transport
#[derive(Debug, Error)]
pub enum LlmError {
    /// Request failed validation
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// No backend can serve the request
    #[error("no provider available for model '{model}' on {endpoint}")]
    ProviderUnavailable { model: String, endpoint: EndpointKind },

    /// Non-retryable backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Every attempt failed transiently
    #[error("all {} failover attempts failed", .attempts.len())]
    FailoverExhausted { attempts: Vec<AttemptError> },

    /// Caller cancelled the request
    #[error("request cancelled")]
    Canceled,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<RoutingError> for LlmError {
    fn from(error: RoutingError) -> Self {
        match error {
            RoutingError::ProviderUnavailable { model, endpoint } => Self::ProviderUnavailable { model, endpoint },
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Backend(error) => match error.kind {
                BackendErrorKind::InvalidRequest | BackendErrorKind::ContentFiltered => StatusCode::BAD_REQUEST,
                BackendErrorKind::NotFound => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::FailoverExhausted { .. } => StatusCode::BAD_GATEWAY,
            Self::Canceled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Validation(_) => "invalid_request_error",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::Backend(_) => "upstream_error",
            Self::FailoverExhausted { .. } => "failover_exhausted",
            Self::Canceled => "request_cancelled",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            // upstream detail stays server-side
            Self::Backend(error) => format!("backend '{}' failed ({})", error.backend, error.kind),
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
