//! Routing-specific error types

use conduit_core::{EndpointKind, HttpError};
use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while resolving a backend
#[derive(Debug, Error)]
pub enum RoutingError {
    /// No candidate survived filtering and tiering
    #[error("no provider available for model '{model}' on {endpoint}")]
    ProviderUnavailable { model: String, endpoint: EndpointKind },
}

impl HttpError for RoutingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ProviderUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::ProviderUnavailable { .. } => "provider_unavailable",
        }
    }

    fn client_message(&self) -> String {
        self.to_string()
    }
}
