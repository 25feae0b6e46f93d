mod event;
mod message;
mod reasoning;
mod request;
mod schema;

#[cfg(test)]
mod tests;

pub use event::{SourceEvent, SourceFinishReason, ToolCallEvent, UpstreamError, Usage};
pub use message::{MediaSource, Message, Part, Role, ToolOutput, parse_data_url};
pub use reasoning::{ReasoningConfig, ReasoningEffort};
pub use request::{ModelOutput, ModelRef, ModelRequest, ToolChoice, ToolDefinition};
pub use schema::{Schema, SchemaKind};
