use http::StatusCode;

/// Trait for domain errors that the transport maps onto wire-level errors
///
/// Implemented by the gateway's error types. Transports (HTTP/SSE, gRPC,
/// WebSocket) translate these into their own error shapes, keeping domain
/// errors decoupled from any particular server framework.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;
}
