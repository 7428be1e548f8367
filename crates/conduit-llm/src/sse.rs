//! Server-sent event framing for canonical streams

use crate::types::StreamEvent;

/// Terminal frame sent after the last event
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Render one stream event as an SSE `data:` frame
///
/// `Done` becomes the `[DONE]` sentinel. Chunks and usage are serialized
/// as their JSON payload without the event envelope.
pub fn encode_event(event: &StreamEvent) -> Result<String, serde_json::Error> {
    let payload = match event {
        StreamEvent::Chunk(chunk) => serde_json::to_string(chunk)?,
        StreamEvent::Usage(usage) => serde_json::to_string(&serde_json::json!({ "usage": usage }))?,
        StreamEvent::Done => return Ok(DONE_FRAME.to_owned()),
    };

    Ok(format!("data: {payload}\n\n"))
}
