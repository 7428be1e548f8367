use conduit_config::CapabilitiesConfig;
use serde::{Deserialize, Serialize};

/// Features a backend must support to serve a request
///
/// Built per call from the request and the execution mode. A backend that
/// lacks any required feature is excluded from every routing tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredCapabilities {
    /// The response will be streamed
    pub streaming: bool,
    /// The request declares tools
    pub tools: bool,
    /// The request contains image input
    pub vision: bool,
    /// The request contains audio input
    pub audio: bool,
}

impl RequiredCapabilities {
    /// No requirements beyond serving the model
    pub const NONE: Self = Self {
        streaming: false,
        tools: false,
        vision: false,
        audio: false,
    };

    /// Whether an offering with `offered` capabilities can serve the request
    pub const fn satisfied_by(&self, offered: &CapabilitiesConfig) -> bool {
        (!self.streaming || offered.streaming)
            && (!self.tools || offered.tools)
            && (!self.vision || offered.vision)
            && (!self.audio || offered.audio)
    }
}
