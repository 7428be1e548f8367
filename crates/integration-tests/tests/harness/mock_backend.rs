//! In-process mock backend for integration tests
//!
//! Returns canned responses and streams, and can fail a configurable number
//! of calls before succeeding.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use conduit_llm::types::Usage;
use conduit_llm::{
    Backend, BackendError, BackendErrorKind, CanonicalChunk, CanonicalRequest, CanonicalResponse, ChunkStream,
    StreamEvent,
};
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

/// Mock backend that returns predictable responses
#[derive(Clone)]
pub struct MockBackend {
    id: String,
    state: Arc<MockState>,
}

struct MockState {
    calls: AtomicU32,
    /// Calls left to fail before succeeding (`u32::MAX` = always fail)
    failures_left: AtomicU32,
    error_kind: BackendErrorKind,
    content: String,
    usage: Option<Usage>,
    stream: Vec<Result<StreamEvent, BackendError>>,
    hang_after_stream: bool,
    hang: bool,
    requests: Mutex<Vec<CanonicalRequest>>,
}

impl MockBackend {
    /// Backend that always succeeds
    pub fn new(id: &str) -> Self {
        Self::build(id, MockOptions::default())
    }

    /// Backend that fails the first `n` calls with `kind`
    pub fn failing(id: &str, n: u32, kind: BackendErrorKind) -> Self {
        Self::build(
            id,
            MockOptions {
                failures: n,
                error_kind: kind,
                ..MockOptions::default()
            },
        )
    }

    /// Backend that fails every call with `kind`
    pub fn always_failing(id: &str, kind: BackendErrorKind) -> Self {
        Self::failing(id, u32::MAX, kind)
    }

    /// Backend with explicit options
    pub fn build(id: &str, options: MockOptions) -> Self {
        let stream = options.stream.unwrap_or_else(|| {
            ["Hel", "lo", "!"]
                .into_iter()
                .map(|text| Ok(StreamEvent::Chunk(CanonicalChunk::text(text))))
                .chain([Ok(StreamEvent::Done)])
                .collect()
        });

        Self {
            id: id.to_owned(),
            state: Arc::new(MockState {
                calls: AtomicU32::new(0),
                failures_left: AtomicU32::new(options.failures),
                error_kind: options.error_kind,
                content: options.content.unwrap_or_else(|| format!("Hello from {id}")),
                usage: options.usage,
                stream,
                hang_after_stream: options.hang_after_stream,
                hang: options.hang,
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of dispatches received
    pub fn calls(&self) -> u32 {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// Requests received, in order
    pub fn requests(&self) -> Vec<CanonicalRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Shareable handle for registering with a gateway
    pub fn handle(&self) -> Arc<dyn Backend> {
        Arc::new(self.clone())
    }

    fn record(&self, request: &CanonicalRequest) -> Result<(), BackendError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        self.state.requests.lock().unwrap().push(request.clone());

        let failing = self
            .state
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                u32::MAX => Some(u32::MAX),
                n => Some(n - 1),
            })
            .is_ok();

        if failing {
            Err(BackendError::new(&self.id, self.state.error_kind, "mock failure"))
        } else {
            Ok(())
        }
    }
}

/// Knobs for [`MockBackend::build`]
pub struct MockOptions {
    pub failures: u32,
    pub error_kind: BackendErrorKind,
    pub content: Option<String>,
    pub usage: Option<Usage>,
    pub stream: Option<Vec<Result<StreamEvent, BackendError>>>,
    pub hang_after_stream: bool,
    /// Never answer unary calls
    pub hang: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            failures: 0,
            error_kind: BackendErrorKind::Server,
            content: None,
            usage: None,
            stream: None,
            hang_after_stream: false,
            hang: false,
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn id(&self) -> &str {
        &self.id
    }

    async fn complete(
        &self,
        request: &CanonicalRequest,
        _cancel: &CancellationToken,
    ) -> Result<CanonicalResponse, BackendError> {
        self.record(request)?;
        if self.state.hang {
            std::future::pending::<()>().await;
        }

        let mut response = CanonicalResponse::text(self.state.content.clone());
        response.usage = self.state.usage;
        Ok(response)
    }

    async fn complete_stream(
        &self,
        request: &CanonicalRequest,
        _cancel: &CancellationToken,
    ) -> Result<ChunkStream, BackendError> {
        self.record(request)?;

        let events = stream::iter(self.state.stream.clone());
        if self.state.hang_after_stream {
            Ok(events.chain(stream::pending()).boxed())
        } else {
            Ok(events.boxed())
        }
    }
}
