//! Translation, normalization, and failover core for Conduit
//!
//! Callers hand a [`CanonicalRequest`] and a [`RequestContext`] to a
//! [`Gateway`], which validates and translates the request, resolves it to
//! a backend, and retries transient failures on other backends. Responses
//! and streamed chunks come back normalized and translated for the backend
//! that produced them.
//!
//! [`RequestContext`]: conduit_core::RequestContext

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod backend;
pub mod error;
pub mod failover;
pub mod gateway;
pub mod normalize;
pub mod pipeline;
pub mod sse;
pub mod stream;
pub mod translate;
pub mod types;

pub use backend::{Backend, ChunkStream};
pub use error::{AttemptError, BackendError, BackendErrorKind, LlmError, ValidationError};
pub use failover::BackoffPolicy;
pub use gateway::{Gateway, GatewayBuilder};
pub use normalize::StreamNormalizer;
pub use pipeline::{TranslationPipeline, validate_request};
pub use stream::EventStream;
pub use translate::{Chain, FnTranslator, NoopTranslator, Translator};
pub use types::{CanonicalChunk, CanonicalRequest, CanonicalResponse, StreamEvent};
