use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "openai_chat")]
    OpenAIChat,
    #[serde(rename = "claude")]
    Claude,
    #[serde(rename = "openai_response")]
    OpenAIResponse,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::OpenAIChat => "openai_chat",
            Dialect::Claude => "claude",
            Dialect::OpenAIResponse => "openai_response",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFormat {
    SseNamedEvent,
    SseDataOnly,
}

pub fn stream_format(dialect: Dialect) -> StreamFormat {
    match dialect {
        Dialect::OpenAIChat => StreamFormat::SseDataOnly,
        Dialect::Claude | Dialect::OpenAIResponse => StreamFormat::SseNamedEvent,
    }
}
