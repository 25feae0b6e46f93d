//! Wire types for the dialects llmrelay speaks downstream, plus SSE framing.
//!
//! Nothing in this crate knows about providers or request lifecycles; it only
//! describes bytes on the wire.

pub mod claude;
pub mod error;
pub mod openai;
pub mod sse;

pub use error::{ApiErrorBody, ApiErrorDetail};
pub use sse::{SseEvent, SseFrame, SseParser, format_data, format_done, format_event};
