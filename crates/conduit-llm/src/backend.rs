//! Backend trait implemented by each upstream adapter

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::types::{CanonicalRequest, CanonicalResponse, StreamEvent};

/// Stream of canonical events from one backend
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, BackendError>> + Send>>;

/// An upstream that can serve canonical requests
///
/// The request's `model` has already been rewritten to the backend's
/// upstream name. Implementations should stop work promptly once `cancel`
/// fires; the gateway races every call against it regardless.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend id, matching its `[providers.<id>]` table
    fn id(&self) -> &str;

    /// Send a unary request
    async fn complete(
        &self,
        request: &CanonicalRequest,
        cancel: &CancellationToken,
    ) -> Result<CanonicalResponse, BackendError>;

    /// Open a streaming request
    ///
    /// An error here happens before any chunk reaches the caller and can be
    /// failed over. Errors yielded by the stream itself are terminal.
    async fn complete_stream(
        &self,
        request: &CanonicalRequest,
        cancel: &CancellationToken,
    ) -> Result<ChunkStream, BackendError>;
}
