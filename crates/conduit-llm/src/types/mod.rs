//! Canonical, backend-agnostic request and response types
//!
//! Every vendor wire format converts to and from these at the transport
//! boundary. Translators only ever see canonical values.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Content, ContentPart, FunctionCall, Message, Role, ToolCall};
pub use request::{CanonicalRequest, ExecutionMode, GenerationOptions};
pub use response::{CanonicalResponse, FinishReason, Usage};
pub use stream::{CanonicalChunk, FunctionCallDelta, StreamEvent, ToolCallDelta};
pub use tool::{FunctionDefinition, ToolDefinition};
