use conduit_core::EndpointKind;
use conduit_routing::RequiredCapabilities;
use serde::{Deserialize, Serialize};

use super::message::Message;
use super::tool::ToolDefinition;

/// Secondary generation options
///
/// Each absent field means "backend default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature (0.0 to 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Stop sequences
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

/// Canonical inbound request
///
/// Built once by the transport. Translators consume it and return a new
/// value rather than mutating a shared one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRequest {
    /// Endpoint kind targeted
    #[serde(default)]
    pub endpoint: EndpointKind,
    /// Requested model id, not yet resolved to a backend
    pub model: String,
    /// Conversation messages in order
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Tools the model may call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Tool selection directive, passed through opaquely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<serde_json::Value>,
    /// Response format directive, passed through opaquely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    /// Generation options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

/// How the response will be delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Single response
    Unary,
    /// Incremental chunks
    Streaming,
}

impl CanonicalRequest {
    /// Chat request for `model` with the given messages
    pub fn chat(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            endpoint: EndpointKind::ChatCompletions,
            model: model.into(),
            messages,
            ..Self::default()
        }
    }

    /// Features a backend needs to serve this request in `mode`
    pub fn required_capabilities(&self, mode: ExecutionMode) -> RequiredCapabilities {
        RequiredCapabilities {
            streaming: mode == ExecutionMode::Streaming,
            tools: self.tools.as_ref().is_some_and(|tools| !tools.is_empty()),
            vision: self.messages.iter().any(|m| m.content.has_image()),
            audio: self.messages.iter().any(|m| m.content.has_audio()),
        }
    }
}
