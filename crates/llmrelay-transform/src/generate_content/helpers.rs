use std::collections::HashMap;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::canonical::{MediaSource, Message, Part, Role, parse_data_url};

pub(crate) const UNKNOWN_TOOL_NAME: &str = "unknown";

/// Tool arguments are stored serialized; dialects that carry them as an
/// object get `{}` when the string is not valid JSON.
pub(crate) fn parse_tool_arguments(arguments: &str) -> JsonValue {
    if arguments.trim().is_empty() {
        return JsonValue::Object(Default::default());
    }
    match serde_json::from_str(arguments) {
        Ok(value) => value,
        Err(err) => {
            debug!(event = "tool_arguments_unparsable", error = %err, "tool arguments are not valid JSON");
            JsonValue::Object(Default::default())
        }
    }
}

/// Call id -> tool name, built from tool calls seen earlier in a history.
#[derive(Debug, Default)]
pub(crate) struct ToolNames {
    names: HashMap<String, String>,
}

impl ToolNames {
    pub(crate) fn record(&mut self, id: &str, name: &str) {
        self.names.insert(id.to_string(), name.to_string());
    }

    pub(crate) fn resolve(&self, id: &str) -> String {
        self.names
            .get(id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TOOL_NAME.to_string())
    }
}

/// Image reference from an OpenAI-style URL field; `data:` URLs become
/// inline base64.
pub(crate) fn image_from_url(url: &str) -> Part {
    match parse_data_url(url) {
        Some((media_type, data)) => Part::Image {
            source: MediaSource::Base64 { data },
            media_type: Some(media_type),
        },
        None => Part::Image {
            source: MediaSource::Url {
                url: url.to_string(),
            },
            media_type: None,
        },
    }
}

/// File attachment from inline data, a hosted id, or a URL, in that order of
/// preference. `None` when no source is present.
pub(crate) fn file_part(
    file_data: Option<String>,
    file_id: Option<String>,
    file_url: Option<String>,
    filename: Option<String>,
) -> Option<Part> {
    let (source, media_type) = if let Some(data) = file_data {
        match parse_data_url(&data) {
            Some((media_type, data)) => (MediaSource::Base64 { data }, Some(media_type)),
            None => (MediaSource::Base64 { data }, None),
        }
    } else if let Some(file_id) = file_id {
        (MediaSource::FileId { file_id }, None)
    } else {
        (MediaSource::Url { url: file_url? }, None)
    };
    Some(Part::File {
        source,
        media_type,
        filename,
    })
}

/// Appends a part to the last message when it has the same role, otherwise
/// starts a new message.
pub(crate) fn push_merged(messages: &mut Vec<Message>, role: Role, part: Part) {
    match messages.last_mut() {
        Some(last) if last.role == role => last.parts.push(part),
        _ => messages.push(Message::new(role, vec![part])),
    }
}
