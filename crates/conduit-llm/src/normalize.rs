//! Tool-call identifier normalization
//!
//! Every tool call handed to a client must carry a non-empty id so the
//! client can correlate the tool result it sends back. Backends that omit
//! ids get a fresh `call_<uuid>` token.
//!
//! Unary responses are normalized statelessly. A single chunk cannot be
//! normalized that way because an id belongs to a call spread over many
//! fragments, so [`normalize_chunk`] is a pass-through and streams that need
//! ids use a [`StreamNormalizer`] scoped to one stream.

use std::collections::HashMap;

use crate::types::{CanonicalChunk, CanonicalResponse};

/// Fresh collision-resistant tool-call id
pub fn generate_tool_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Fill missing or empty tool-call ids, keeping present ones
///
/// Idempotent: a second pass finds every id present and changes nothing.
pub fn normalize_response(mut response: CanonicalResponse) -> CanonicalResponse {
    for call in response.tool_calls.iter_mut().flatten() {
        if call.id.as_deref().is_none_or(str::is_empty) {
            call.id = Some(generate_tool_call_id());
        }
    }
    response
}

/// Stateless chunk normalization: a pass-through
///
/// See [`StreamNormalizer`] for the stream-scoped variant.
pub const fn normalize_chunk(chunk: CanonicalChunk) -> CanonicalChunk {
    chunk
}

/// Correlation context for tool-call ids across one stream's chunks
///
/// Tracks ids per tool-call index. The first fragment of a call that
/// arrives without an id gets a synthesized one; once an index has an id
/// (upstream or synthesized) no further id is generated for it, and a later
/// upstream id for that index is rewritten to the one already handed out.
#[derive(Debug, Default)]
pub struct StreamNormalizer {
    ids: HashMap<u32, String>,
    last: Option<u32>,
}

impl StreamNormalizer {
    /// Context for a new stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign ids to tool-call fragments that open a call without one
    ///
    /// A fragment without an index opens a new call when it names a function
    /// and otherwise continues the most recent call.
    pub fn normalize(&mut self, mut chunk: CanonicalChunk) -> CanonicalChunk {
        for delta in chunk.tool_calls.iter_mut().flatten() {
            let opens_call = delta.function.as_ref().is_some_and(|f| f.name.is_some());
            let index = match (delta.index, self.last) {
                (Some(index), _) => index,
                (None, Some(last)) if !opens_call => last,
                (None, _) => self.next_free_index(),
            };
            self.last = Some(index);

            match delta.id.as_deref() {
                Some(id) if !id.is_empty() => match self.ids.get(&index) {
                    Some(known) if known != id => {
                        tracing::trace!(index, upstream = id, id = %known, "kept earlier streaming tool call id");
                        delta.id = Some(known.clone());
                    }
                    Some(_) => {}
                    None => {
                        self.ids.insert(index, id.to_owned());
                    }
                },
                _ if self.ids.contains_key(&index) => {}
                _ => {
                    let id = generate_tool_call_id();
                    tracing::trace!(index, id = %id, "synthesized streaming tool call id");
                    self.ids.insert(index, id.clone());
                    delta.id = Some(id);
                }
            }
        }
        chunk
    }

    fn next_free_index(&self) -> u32 {
        self.ids.keys().max().map_or(0, |max| max.saturating_add(1))
    }

    /// Id assigned to the call at `index`, if any fragment has been seen
    pub fn id_for(&self, index: u32) -> Option<&str> {
        self.ids.get(&index).map(String::as_str)
    }
}
