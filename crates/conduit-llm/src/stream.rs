//! Translation of upstream event streams handed to callers
//!
//! Chunks are translated one at a time in arrival order and never buffered.
//! Every stream ends with exactly one `Done` unless it ends in an error or
//! is cancelled, in which case the `Err` item is the last one.

use std::pin::Pin;
use std::sync::Arc;

use conduit_state::QuotaStore;
use futures_util::{Stream, StreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::backend::ChunkStream;
use crate::error::LlmError;
use crate::normalize::StreamNormalizer;
use crate::pipeline::TranslationPipeline;
use crate::types::{CanonicalChunk, StreamEvent};

/// Translated event stream returned by [`crate::Gateway::complete_stream`]
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Per-stream state threaded through the unfold
pub(crate) struct StreamState {
    upstream: ChunkStream,
    backend: String,
    pipeline: Arc<TranslationPipeline>,
    normalizer: Option<StreamNormalizer>,
    token_quota: Option<Arc<dyn QuotaStore>>,
    cancel: CancellationToken,
    chunks: usize,
    finished: bool,
}

impl StreamState {
    pub(crate) fn new(
        upstream: ChunkStream,
        backend: String,
        pipeline: Arc<TranslationPipeline>,
        normalize_ids: bool,
        token_quota: Option<Arc<dyn QuotaStore>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            upstream,
            backend,
            pipeline,
            normalizer: normalize_ids.then(StreamNormalizer::new),
            token_quota,
            cancel,
            chunks: 0,
            finished: false,
        }
    }

    pub(crate) fn into_stream(self) -> EventStream {
        Box::pin(stream::unfold(self, |mut state| async move {
            if state.finished {
                return None;
            }

            let next = tokio::select! {
                biased;
                () = state.cancel.cancelled() => None,
                next = state.upstream.next() => Some(next),
            };

            let item = match next {
                None => {
                    tracing::debug!(backend = %state.backend, chunks = state.chunks, "stream cancelled");
                    state.finished = true;
                    Err(LlmError::Canceled)
                }
                Some(Some(Ok(StreamEvent::Chunk(chunk)))) => {
                    state.chunks += 1;
                    Ok(StreamEvent::Chunk(state.translate(chunk)))
                }
                Some(Some(Ok(StreamEvent::Usage(usage)))) => {
                    if let Some(quota) = &state.token_quota {
                        quota
                            .increment_usage(&state.backend, u64::from(usage.total_tokens))
                            .await;
                    }
                    Ok(StreamEvent::Usage(usage))
                }
                Some(Some(Ok(StreamEvent::Done)) | None) => {
                    tracing::debug!(backend = %state.backend, chunks = state.chunks, "stream finished");
                    state.finished = true;
                    Ok(StreamEvent::Done)
                }
                Some(Some(Err(error))) => {
                    tracing::warn!(backend = %state.backend, chunks = state.chunks, error = %error, "stream failed");
                    state.finished = true;
                    Err(LlmError::Backend(error))
                }
            };

            Some((item, state))
        }))
    }

    fn translate(&mut self, mut chunk: CanonicalChunk) -> CanonicalChunk {
        chunk.backend = Some(self.backend.clone());
        match self.normalizer.as_mut() {
            Some(normalizer) => self.pipeline.translate_chunk_with(normalizer, chunk),
            None => self.pipeline.translate_chunk(chunk),
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::error::{BackendError, BackendErrorKind};
    use crate::types::{ToolCallDelta, Usage};

    fn upstream(events: Vec<Result<StreamEvent, BackendError>>) -> ChunkStream {
        Box::pin(stream::iter(events))
    }

    fn state(events: Vec<Result<StreamEvent, BackendError>>, normalize: bool) -> StreamState {
        StreamState::new(
            upstream(events),
            "groq".to_owned(),
            Arc::new(TranslationPipeline::new()),
            normalize,
            None,
            CancellationToken::new(),
        )
    }

    fn text(event: &Result<StreamEvent, LlmError>) -> Option<&str> {
        match event {
            Ok(StreamEvent::Chunk(chunk)) => chunk.content.as_deref(),
            _ => None,
        }
    }

    #[tokio::test]
    async fn chunks_pass_through_in_order() {
        let events = ["Hel", "lo", "!"]
            .into_iter()
            .map(|t| Ok(StreamEvent::Chunk(CanonicalChunk::text(t))))
            .chain([Ok(StreamEvent::Done)])
            .collect();

        let out: Vec<_> = state(events, true).into_stream().collect().await;

        let texts: Vec<_> = out.iter().filter_map(text).collect();
        assert_eq!(texts, ["Hel", "lo", "!"]);
        assert!(matches!(out.last(), Some(Ok(StreamEvent::Done))));
        assert_eq!(out.len(), 4);
    }

    #[tokio::test]
    async fn chunks_are_stamped_with_backend() {
        let events = vec![Ok(StreamEvent::Chunk(CanonicalChunk::text("a")))];
        let out: Vec<_> = state(events, false).into_stream().collect().await;

        let Ok(StreamEvent::Chunk(chunk)) = &out[0] else {
            panic!("expected chunk");
        };
        assert_eq!(chunk.backend.as_deref(), Some("groq"));
    }

    #[tokio::test]
    async fn missing_done_is_synthesized_once() {
        let events = vec![Ok(StreamEvent::Chunk(CanonicalChunk::text("a")))];
        let out: Vec<_> = state(events, false).into_stream().collect().await;

        assert_eq!(out.len(), 2);
        assert!(matches!(out[1], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn nothing_follows_done() {
        let events = vec![
            Ok(StreamEvent::Done),
            Ok(StreamEvent::Chunk(CanonicalChunk::text("late"))),
        ];
        let out: Vec<_> = state(events, false).into_stream().collect().await;
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn upstream_error_is_terminal() {
        let events = vec![
            Ok(StreamEvent::Chunk(CanonicalChunk::text("a"))),
            Err(BackendError::new("groq", BackendErrorKind::Stream, "reset")),
            Ok(StreamEvent::Chunk(CanonicalChunk::text("b"))),
        ];
        let out: Vec<_> = state(events, false).into_stream().collect().await;

        assert_eq!(out.len(), 2);
        assert!(matches!(&out[1], Err(LlmError::Backend(e)) if e.kind == BackendErrorKind::Stream));
    }

    #[tokio::test]
    async fn cancellation_ends_the_stream() {
        let cancel = CancellationToken::new();
        let state = StreamState::new(
            Box::pin(stream::pending::<Result<StreamEvent, BackendError>>()),
            "groq".to_owned(),
            Arc::new(TranslationPipeline::new()),
            false,
            None,
            cancel.clone(),
        );
        let mut events = state.into_stream();

        cancel.cancel();
        assert!(matches!(events.next().await, Some(Err(LlmError::Canceled))));
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_tool_call_ids_are_synthesized() {
        let fragment = |index| {
            Ok(StreamEvent::Chunk(CanonicalChunk {
                tool_calls: Some(vec![ToolCallDelta {
                    index: Some(index),
                    ..ToolCallDelta::default()
                }]),
                ..CanonicalChunk::default()
            }))
        };
        let events = vec![fragment(0), fragment(0)];
        let out: Vec<_> = state(events, true).into_stream().collect().await;

        let ids: Vec<_> = out
            .iter()
            .filter_map(|event| match event {
                Ok(StreamEvent::Chunk(chunk)) => Some(chunk.tool_calls.as_ref()?[0].id.clone()),
                _ => None,
            })
            .collect();
        assert!(ids[0].as_deref().is_some_and(|id| id.starts_with("call_")));
        assert_eq!(ids[1], None);
    }

    #[tokio::test]
    async fn usage_charges_token_quota() {
        use std::collections::HashMap;
        use std::time::Duration;

        use conduit_state::storage::memory::MemoryQuotaStore;

        let quota = Arc::new(MemoryQuotaStore::new(
            HashMap::from([("groq".to_owned(), 1000)]),
            Duration::from_secs(3600),
        ));
        let usage = Usage {
            prompt_tokens: 10,
            completion_tokens: 32,
            total_tokens: 42,
        };
        let state = StreamState::new(
            upstream(vec![Ok(StreamEvent::Usage(usage)), Ok(StreamEvent::Done)]),
            "groq".to_owned(),
            Arc::new(TranslationPipeline::new()),
            false,
            Some(Arc::clone(&quota) as Arc<dyn QuotaStore>),
            CancellationToken::new(),
        );

        let out: Vec<_> = state.into_stream().collect().await;
        assert!(matches!(out[0], Ok(StreamEvent::Usage(u)) if u.total_tokens == 42));
        assert_eq!(quota.quota_status("groq").await.used, 42);
    }
}
