use thiserror::Error;

/// Errors raised while setting up a state store
#[derive(Debug, Error)]
pub enum StateError {
    /// Invalid store configuration
    #[error("state store configuration error: {0}")]
    Config(String),

    /// Redis connection error
    #[error("redis connection error: {0}")]
    Redis(String),

    /// Connecting took longer than the configured timeout
    #[error("timed out connecting to state store")]
    Timeout,
}
