//! Translators configured under `[[translators.*]]`
//!
//! Each configured entry becomes an [`FnTranslator`] whose predicate is the
//! entry's match clause and whose transform is the named action.

use std::sync::Arc;

use conduit_config::{ChunkAction, RequestAction, ResponseAction, TranslatorConfig};
use regex::Regex;

use super::{FnTranslator, Translator};
use crate::types::{CanonicalChunk, CanonicalRequest, CanonicalResponse, Content, ContentPart, Message, Role};

/// Where a configured translator applies
///
/// Matches when the backend is listed or a model pattern matches. With both
/// lists empty it matches everything.
#[derive(Debug, Clone)]
pub struct Matcher {
    backends: Vec<String>,
    models: Vec<Regex>,
}

impl Matcher {
    /// Compile the match clause of a configured translator
    pub fn from_config<A>(config: &TranslatorConfig<A>) -> Result<Self, regex::Error> {
        Ok(Self {
            backends: config.backends.clone(),
            models: config.models.iter().map(|p| Regex::new(p)).collect::<Result<_, _>>()?,
        })
    }

    /// Whether a value from `backend` for `model` is in scope
    pub fn matches(&self, backend: Option<&str>, model: Option<&str>) -> bool {
        if self.backends.is_empty() && self.models.is_empty() {
            return true;
        }

        backend.is_some_and(|backend| self.backends.iter().any(|b| b == backend))
            || model.is_some_and(|model| self.models.iter().any(|re| re.is_match(model)))
    }
}

/// Build a request translator; requests match on their model id
pub fn request_translator(
    config: &TranslatorConfig<RequestAction>,
) -> Result<Arc<dyn Translator<CanonicalRequest>>, regex::Error> {
    let matcher = Matcher::from_config(config)?;
    let predicate = move |request: &CanonicalRequest| matcher.matches(None, Some(&request.model));

    let translator = match config.action.clone() {
        RequestAction::FoldSystemPrompt => FnTranslator::new("fold_system_prompt", predicate, fold_system_prompt),
        RequestAction::ClampMaxTokens { max } => FnTranslator::new(
            "clamp_max_tokens",
            predicate,
            move |request: CanonicalRequest| clamp_max_tokens(request, max),
        ),
        RequestAction::DropSampling => FnTranslator::new("drop_sampling", predicate, drop_sampling),
    };

    Ok(Arc::new(translator))
}

/// Build a response translator; responses match on backend and upstream model
pub fn response_translator(
    config: &TranslatorConfig<ResponseAction>,
) -> Result<Arc<dyn Translator<CanonicalResponse>>, regex::Error> {
    let matcher = Matcher::from_config(config)?;
    let predicate = move |response: &CanonicalResponse| {
        matcher.matches(response.backend.as_deref(), response.model.as_deref())
    };

    let translator = match config.action.clone() {
        ResponseAction::StripReasoning { open, close } => {
            FnTranslator::new("strip_reasoning", predicate, move |response: CanonicalResponse| {
                strip_reasoning(response, &open, &close)
            })
        }
    };

    Ok(Arc::new(translator))
}

/// Build a chunk translator; chunks match on backend only
pub fn chunk_translator(
    config: &TranslatorConfig<ChunkAction>,
) -> Result<Arc<dyn Translator<CanonicalChunk>>, regex::Error> {
    let matcher = Matcher::from_config(config)?;
    let predicate = move |chunk: &CanonicalChunk| matcher.matches(chunk.backend.as_deref(), None);

    let translator = match config.action {
        ChunkAction::AssignToolCallIndexes => {
            FnTranslator::new("assign_tool_call_indexes", predicate, assign_tool_call_indexes)
        }
    };

    Ok(Arc::new(translator))
}

/// Merge system messages into the first user message
///
/// For models without a system role. Without any user message the
/// instructions become the first user message.
pub fn fold_system_prompt(mut request: CanonicalRequest) -> CanonicalRequest {
    let (system, mut rest): (Vec<Message>, Vec<Message>) =
        request.messages.into_iter().partition(|m| m.role == Role::System);

    if system.is_empty() {
        request.messages = rest;
        return request;
    }

    let instructions = system
        .iter()
        .map(|m| m.content.as_text())
        .collect::<Vec<_>>()
        .join("\n\n");

    match rest.iter_mut().find(|m| m.role == Role::User) {
        Some(user) => {
            user.content = match std::mem::replace(&mut user.content, Content::Text(String::new())) {
                Content::Text(text) => Content::Text(format!("{instructions}\n\n{text}")),
                Content::Parts(mut parts) => {
                    parts.insert(0, ContentPart::Text { text: instructions });
                    Content::Parts(parts)
                }
            };
        }
        None => rest.insert(0, Message::user(instructions)),
    }

    request.messages = rest;
    request
}

/// Cap `max_tokens`, setting it when absent
pub fn clamp_max_tokens(mut request: CanonicalRequest, max: u32) -> CanonicalRequest {
    let options = request.options.get_or_insert_default();
    options.max_tokens = Some(options.max_tokens.map_or(max, |current| current.min(max)));
    request
}

/// Remove temperature and nucleus sampling
pub fn drop_sampling(mut request: CanonicalRequest) -> CanonicalRequest {
    if let Some(options) = request.options.as_mut() {
        options.temperature = None;
        options.top_p = None;
    }
    request
}

/// Remove `open ... close` reasoning blocks from the response text
///
/// An unterminated block runs to the end of the text.
pub fn strip_reasoning(mut response: CanonicalResponse, open: &str, close: &str) -> CanonicalResponse {
    if open.is_empty() {
        return response;
    }

    if let Some(content) = response.content.take() {
        let mut stripped = String::with_capacity(content.len());
        let mut rest = content.as_str();

        while let Some(start) = rest.find(open) {
            stripped.push_str(&rest[..start]);
            let after_open = &rest[start + open.len()..];
            rest = match after_open.find(close) {
                Some(end) if !close.is_empty() => &after_open[end + close.len()..],
                _ => "",
            };
        }
        stripped.push_str(rest);

        response.content = Some(stripped.trim_start().to_owned());
    }

    response
}

/// Fill missing tool-call delta indexes with their position in the chunk
pub fn assign_tool_call_indexes(mut chunk: CanonicalChunk) -> CanonicalChunk {
    for (position, delta) in chunk.tool_calls.iter_mut().flatten().enumerate() {
        if delta.index.is_none() {
            delta.index = Some(u32::try_from(position).unwrap_or(u32::MAX));
        }
    }
    chunk
}
