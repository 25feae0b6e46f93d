use bytes::Bytes;
use llmrelay_protocol::claude::create_message::request::CreateMessageRequestBody;
use llmrelay_protocol::openai::create_chat_completions::request::CreateChatCompletionRequestBody;
use llmrelay_protocol::openai::create_response::request::CreateResponseRequestBody;
use llmrelay_protocol::openai::create_response::types::ResponseInput;
use llmrelay_transform::canonical::{ModelRef, ModelRequest};
use llmrelay_transform::generate_content::{
    claude2canonical, openai_chat_completions2canonical, openai_response2canonical,
};
use llmrelay_transform::middleware::Dialect;
use serde::de::DeserializeOwned;

use crate::error::RelayError;

#[derive(Debug, Clone)]
pub enum InboundBody {
    OpenAIChat(CreateChatCompletionRequestBody),
    Claude(CreateMessageRequestBody),
    OpenAIResponse(CreateResponseRequestBody),
}

impl InboundBody {
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::OpenAIChat(_) => Dialect::OpenAIChat,
            Self::Claude(_) => Dialect::Claude,
            Self::OpenAIResponse(_) => Dialect::OpenAIResponse,
        }
    }

    /// Converts the payload into the canonical request addressed at `model`.
    pub fn into_model_request(self, model: String) -> ModelRequest {
        match self {
            Self::OpenAIChat(body) => {
                openai_chat_completions2canonical::transform_request(model, body)
            }
            Self::Claude(body) => claude2canonical::transform_request(model, body),
            Self::OpenAIResponse(body) => openai_response2canonical::transform_request(model, body),
        }
    }
}

/// A validated inbound request.
#[derive(Debug, Clone)]
pub struct Classified {
    pub model: ModelRef,
    /// Model string exactly as the caller sent it.
    pub requested_model: String,
    pub is_stream: bool,
    pub body: InboundBody,
}

impl Classified {
    pub fn dialect(&self) -> Dialect {
        self.body.dialect()
    }
}

pub fn classify_request(dialect: Dialect, body: &Bytes) -> Result<Classified, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(RelayError::validation(
            "missing_body",
            "request body is required",
        ));
    }

    match dialect {
        Dialect::OpenAIChat => {
            let body = parse_json::<CreateChatCompletionRequestBody>(body)?;
            let (model, requested_model) = require_model(body.model.as_deref())?;
            if body.messages.as_ref().is_none_or(Vec::is_empty) {
                return Err(missing_messages());
            }
            Ok(Classified {
                model,
                requested_model,
                is_stream: body.stream.unwrap_or(false),
                body: InboundBody::OpenAIChat(body),
            })
        }
        Dialect::Claude => {
            let body = parse_json::<CreateMessageRequestBody>(body)?;
            let (model, requested_model) = require_model(body.model.as_deref())?;
            if body.messages.as_ref().is_none_or(Vec::is_empty) {
                return Err(missing_messages());
            }
            Ok(Classified {
                model,
                requested_model,
                is_stream: body.stream.unwrap_or(false),
                body: InboundBody::Claude(body),
            })
        }
        Dialect::OpenAIResponse => {
            let body = parse_json::<CreateResponseRequestBody>(body)?;
            let (model, requested_model) = require_model(body.model.as_deref())?;
            let has_input = match &body.input {
                Some(ResponseInput::Text(text)) => !text.is_empty(),
                Some(ResponseInput::Items(items)) => !items.is_empty(),
                None => false,
            };
            if !has_input {
                return Err(RelayError::validation("missing_input", "input is required"));
            }
            Ok(Classified {
                model,
                requested_model,
                is_stream: body.stream.unwrap_or(false),
                body: InboundBody::OpenAIResponse(body),
            })
        }
    }
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, RelayError> {
    serde_json::from_slice(body)
        .map_err(|err| RelayError::validation("invalid_json", format!("invalid request body: {err}")))
}

fn require_model(model: Option<&str>) -> Result<(ModelRef, String), RelayError> {
    let Some(model) = model.map(str::trim).filter(|model| !model.is_empty()) else {
        return Err(RelayError::validation("missing_model", "model is required"));
    };
    let Some(model_ref) = ModelRef::parse(model) else {
        return Err(RelayError::validation(
            "invalid_model",
            format!("model must be `provider:model`, got `{model}`"),
        ));
    };
    Ok((model_ref, model.to_string()))
}

fn missing_messages() -> RelayError {
    RelayError::validation("missing_messages", "messages is required")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(result: Result<Classified, RelayError>) -> &'static str {
        match result {
            Err(RelayError::Validation { code, .. }) => code,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_fields_in_order() {
        let dialect = Dialect::OpenAIChat;
        assert_eq!(code(classify_request(dialect, &Bytes::new())), "missing_body");
        assert_eq!(
            code(classify_request(dialect, &Bytes::from_static(b"{not json"))),
            "invalid_json"
        );
        assert_eq!(
            code(classify_request(dialect, &Bytes::from_static(b"{}"))),
            "missing_model"
        );
        assert_eq!(
            code(classify_request(
                dialect,
                &Bytes::from_static(br#"{"model":"gpt-4o","messages":[]}"#)
            )),
            "invalid_model"
        );
        assert_eq!(
            code(classify_request(
                dialect,
                &Bytes::from_static(br#"{"model":"echo:gpt-4o"}"#)
            )),
            "missing_messages"
        );
    }

    #[test]
    fn responses_require_input() {
        let result = classify_request(
            Dialect::OpenAIResponse,
            &Bytes::from_static(br#"{"model":"echo:x","input":""}"#),
        );
        assert_eq!(code(result), "missing_input");
    }

    #[test]
    fn accepts_claude_stream_request() {
        let classified = classify_request(
            Dialect::Claude,
            &Bytes::from_static(
                br#"{"model":"echo:claude","max_tokens":16,"stream":true,"messages":[{"role":"user","content":"hi"}]}"#,
            ),
        )
        .unwrap();
        assert!(classified.is_stream);
        assert_eq!(classified.dialect(), Dialect::Claude);
        assert_eq!(classified.model.provider, "echo");
        assert_eq!(classified.model.model, "claude");
        assert_eq!(classified.requested_model, "echo:claude");
    }
}
