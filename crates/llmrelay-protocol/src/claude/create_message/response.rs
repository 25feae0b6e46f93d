use serde::{Deserialize, Serialize};

use crate::claude::create_message::types::{
    AssistantRole, ContentBlock, MessageType, StopReason, Usage,
};

/// Also used as the `message` payload of `message_start`, where `content` is
/// empty and `stop_reason` is `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMessageResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub r#type: MessageType,
    pub role: AssistantRole,
    pub model: String,
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}
