//! Validation and translation around every dispatch
//!
//! Requests are validated, then rewritten by the request chain. Responses
//! and chunks are normalized first and rewritten by their chain after, so
//! translators always see complete tool-call ids.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use conduit_config::TranslatorsConfig;
use conduit_core::EndpointKind;

use crate::error::ValidationError;
use crate::normalize::{StreamNormalizer, normalize_chunk, normalize_response};
use crate::translate::{Chain, Translator, builtin};
use crate::types::{CanonicalChunk, CanonicalRequest, CanonicalResponse, Role};

/// Request, response, and chunk translator chains
#[derive(Debug, Default)]
pub struct TranslationPipeline {
    requests: Chain<CanonicalRequest>,
    responses: Chain<CanonicalResponse>,
    chunks: Chain<CanonicalChunk>,
}

impl TranslationPipeline {
    /// Pipeline with empty chains
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the chains declared under `[translators]`, in declaration order
    pub fn from_config(config: &TranslatorsConfig) -> anyhow::Result<Self> {
        let mut pipeline = Self::new();

        for (i, translator) in config.request.iter().enumerate() {
            let built = builtin::request_translator(translator).with_context(|| format!("translators.request[{i}]"))?;
            pipeline.requests.push(built);
        }
        for (i, translator) in config.response.iter().enumerate() {
            let built =
                builtin::response_translator(translator).with_context(|| format!("translators.response[{i}]"))?;
            pipeline.responses.push(built);
        }
        for (i, translator) in config.chunk.iter().enumerate() {
            let built = builtin::chunk_translator(translator).with_context(|| format!("translators.chunk[{i}]"))?;
            pipeline.chunks.push(built);
        }

        tracing::debug!(
            request = pipeline.requests.len(),
            response = pipeline.responses.len(),
            chunk = pipeline.chunks.len(),
            "translator chains built"
        );

        Ok(pipeline)
    }

    /// Append a request translator
    #[must_use]
    pub fn with_request_translator(mut self, translator: Arc<dyn Translator<CanonicalRequest>>) -> Self {
        self.requests.push(translator);
        self
    }

    /// Append a response translator
    #[must_use]
    pub fn with_response_translator(mut self, translator: Arc<dyn Translator<CanonicalResponse>>) -> Self {
        self.responses.push(translator);
        self
    }

    /// Append a chunk translator
    #[must_use]
    pub fn with_chunk_translator(mut self, translator: Arc<dyn Translator<CanonicalChunk>>) -> Self {
        self.chunks.push(translator);
        self
    }

    /// Rewrite a validated request for its model
    pub fn translate_request(&self, request: CanonicalRequest) -> CanonicalRequest {
        self.requests.dispatch(request)
    }

    /// Normalize then rewrite a unary response
    pub fn translate_response(&self, response: CanonicalResponse) -> CanonicalResponse {
        self.responses.dispatch(normalize_response(response))
    }

    /// Normalize then rewrite a chunk without stream context
    pub fn translate_chunk(&self, chunk: CanonicalChunk) -> CanonicalChunk {
        self.chunks.dispatch(normalize_chunk(chunk))
    }

    /// Rewrite a chunk, then assign tool-call ids from the stream's context
    ///
    /// Chunk translators run first here since they may fill in the indexes
    /// the normalizer keys ids on.
    pub fn translate_chunk_with(&self, normalizer: &mut StreamNormalizer, chunk: CanonicalChunk) -> CanonicalChunk {
        normalizer.normalize(self.chunks.dispatch(chunk))
    }
}

/// Reject malformed canonical requests before any backend sees them
pub fn validate_request(request: &CanonicalRequest) -> Result<(), ValidationError> {
    if request.model.trim().is_empty() {
        return Err(ValidationError::EmptyModel);
    }

    if request.endpoint == EndpointKind::ChatCompletions && request.messages.is_empty() {
        return Err(ValidationError::NoMessages);
    }

    if let Some(index) = request
        .messages
        .iter()
        .position(|m| m.role == Role::Tool && m.tool_call_id.as_deref().is_none_or(str::is_empty))
    {
        return Err(ValidationError::MissingToolCallId { index });
    }

    if let Some(options) = &request.options {
        if let Some(temperature) = options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ValidationError::OutOfRange {
                field: "temperature",
                range: "between 0 and 2",
            });
        }
        if let Some(top_p) = options.top_p
            && (top_p.is_nan() || top_p <= 0.0 || top_p > 1.0)
        {
            return Err(ValidationError::OutOfRange {
                field: "top_p",
                range: "greater than 0 and at most 1",
            });
        }
        if options.max_tokens == Some(0) {
            return Err(ValidationError::OutOfRange {
                field: "max_tokens",
                range: "greater than 0",
            });
        }
    }

    let mut seen = HashSet::new();
    for (index, tool) in request.tools.iter().flatten().enumerate() {
        let name = tool.function.name.as_str();
        if name.is_empty() {
            return Err(ValidationError::EmptyToolName { index });
        }
        if !seen.insert(name) {
            return Err(ValidationError::DuplicateTool { name: name.to_owned() });
        }
    }

    Ok(())
}
