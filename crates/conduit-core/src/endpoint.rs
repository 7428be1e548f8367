use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of inference endpoint a request targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EndpointKind {
    /// Chat-style completions
    #[default]
    ChatCompletions,
    /// Vector embeddings
    Embeddings,
    /// Image generation from a prompt
    ImageGeneration,
}
