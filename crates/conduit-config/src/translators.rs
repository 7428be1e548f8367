use serde::Deserialize;

/// Translators per axis, applied first-match-wins in declaration order
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslatorsConfig {
    /// Rewrites applied to canonical requests before resolution
    #[serde(default)]
    pub request: Vec<TranslatorConfig<RequestAction>>,
    /// Rewrites applied to unary responses
    #[serde(default)]
    pub response: Vec<TranslatorConfig<ResponseAction>>,
    /// Rewrites applied to each streamed chunk
    #[serde(default)]
    pub chunk: Vec<TranslatorConfig<ChunkAction>>,
}

/// A configured translator: where it applies and what it does
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslatorConfig<A> {
    /// Backend ids this translator applies to
    #[serde(default)]
    pub backends: Vec<String>,
    /// Model id patterns (regex) this translator applies to
    #[serde(default)]
    pub models: Vec<String>,
    /// Rewrite to perform
    pub action: A,
}

/// Request rewrites
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestAction {
    /// Merge system messages into the first user message
    FoldSystemPrompt,
    /// Cap the maximum output tokens
    ClampMaxTokens {
        /// Largest allowed value
        max: u32,
    },
    /// Remove temperature and nucleus sampling
    DropSampling,
}

/// Unary response rewrites
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseAction {
    /// Remove inline reasoning blocks from content
    StripReasoning {
        /// Opening delimiter
        #[serde(default = "default_reasoning_open")]
        open: String,
        /// Closing delimiter
        #[serde(default = "default_reasoning_close")]
        close: String,
    },
}

/// Streamed chunk rewrites
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChunkAction {
    /// Fill missing tool-call delta indexes by position
    AssignToolCallIndexes,
}

fn default_reasoning_open() -> String {
    "<think>".to_owned()
}

fn default_reasoning_close() -> String {
    "</think>".to_owned()
}
